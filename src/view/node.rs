use std::cell::Cell;

use bitflags::bitflags;
use glam::Vec2;
use smol_str::SmolStr;

use super::Rect;
use crate::effect::{Effect, EffectId, EffectStatus, TransformDelta, combine_effects};
use crate::transition::{Animation, AnimationId, AnimationStatus};

/// Per-second rate of the exponential approach used for position changes.
pub const POSITION_SMOOTHING: f32 = 12.0;
pub const SCALE_SMOOTHING: f32 = 10.0;
pub const EFFECT_SCALE_SMOOTHING: f32 = 14.0;

const POSITION_EPSILON: f32 = 0.01;
const SCALE_EPSILON: f32 = 0.0005;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        const POSITION = 1 << 0;
        const SIZE = 1 << 1;
        const CHILDREN = 1 << 2;
        const CONTENT = 1 << 3;
        const VISIBILITY = 1 << 4;
        const STYLE = 1 << 5;
        const LAYOUT = 1 << 6;
    }
}

impl DirtyFlags {
    /// Flags that invalidate cached bounds of the node and its subtree.
    pub const GEOMETRY: Self = Self::POSITION.union(Self::SIZE).union(Self::LAYOUT);
}

fn approach(current: f32, target: f32, rate: f32, dt: f32, epsilon: f32) -> f32 {
    let next = current + (target - current) * (1.0 - (-rate * dt).exp());
    if (target - next).abs() <= epsilon {
        target
    } else {
        next
    }
}

fn sanitize_scalar(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// State every scene node carries, independent of what the node draws.
///
/// Mutators on this type only record dirty flags locally. Going through
/// [`SceneTree`](super::SceneTree) (or mutating inside a widget hook) is what
/// propagates them to ancestors and invalidates cached bounds.
#[derive(Debug)]
pub struct NodeState {
    pub(crate) debug_name: Option<SmolStr>,
    pub(crate) position: Vec2,
    pub(crate) target_position: Vec2,
    pub(crate) size: Vec2,
    pub(crate) scale: f32,
    pub(crate) target_scale: f32,
    pub(crate) effect_scale: f32,
    pub(crate) visible: bool,
    pub(crate) hovered: bool,
    pub(crate) dirty: DirtyFlags,
    pub(crate) bounds_cache: Cell<Option<Rect>>,
    pub(crate) effects: Vec<Effect>,
    pub(crate) animations: Vec<Animation>,
    pub(crate) combined_effect: TransformDelta,
    pub(crate) effects_affect_layout: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            debug_name: None,
            position: Vec2::ZERO,
            target_position: Vec2::ZERO,
            size: Vec2::ZERO,
            scale: 1.0,
            target_scale: 1.0,
            effect_scale: 1.0,
            visible: true,
            hovered: false,
            dirty: DirtyFlags::empty(),
            bounds_cache: Cell::new(None),
            effects: Vec::new(),
            animations: Vec::new(),
            combined_effect: TransformDelta::IDENTITY,
            effects_affect_layout: false,
        }
    }
}

impl NodeState {
    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }

    pub fn set_debug_name(&mut self, name: impl Into<SmolStr>) {
        self.debug_name = Some(name.into());
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn target_position(&self) -> Vec2 {
        self.target_position
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    pub fn effect_scale(&self) -> f32 {
        self.effect_scale
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn combined_effect(&self) -> TransformDelta {
        self.combined_effect
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn effects_affect_layout(&self) -> bool {
        self.effects_affect_layout
    }

    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    /// Moves immediately, dropping any position animation in flight.
    pub fn set_position(&mut self, position: Vec2) {
        let position = Vec2::new(sanitize_scalar(position.x), sanitize_scalar(position.y));
        self.target_position = position;
        if self.position != position {
            self.position = position;
            self.mark_dirty(DirtyFlags::POSITION);
        }
    }

    pub fn set_x(&mut self, x: f32) {
        self.set_position(Vec2::new(x, self.position.y));
    }

    pub fn set_y(&mut self, y: f32) {
        self.set_position(Vec2::new(self.position.x, y));
    }

    /// Eases toward `position`; an animation already in flight is retargeted.
    pub fn move_to(&mut self, position: Vec2) {
        let target = Vec2::new(sanitize_scalar(position.x), sanitize_scalar(position.y));
        if self.target_position != target {
            self.target_position = target;
            if self.position != target {
                self.mark_dirty(DirtyFlags::POSITION);
            }
        }
    }

    pub fn set_size(&mut self, size: Vec2) {
        let size = Vec2::new(
            sanitize_scalar(size.x).max(0.0),
            sanitize_scalar(size.y).max(0.0),
        );
        if self.size != size {
            self.size = size;
            self.mark_dirty(DirtyFlags::SIZE);
        }
    }

    pub fn set_scale(&mut self, scale: f32) {
        let scale = sanitize_scalar(scale).max(0.0);
        self.target_scale = scale;
        if self.scale != scale {
            self.scale = scale;
            self.mark_dirty(DirtyFlags::SIZE);
        }
    }

    pub fn scale_to(&mut self, scale: f32) {
        let target = sanitize_scalar(scale).max(0.0);
        if self.target_scale != target {
            self.target_scale = target;
            if self.scale != target {
                self.mark_dirty(DirtyFlags::SIZE);
            }
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.mark_dirty(DirtyFlags::VISIBILITY);
        }
    }

    pub(crate) fn set_hovered(&mut self, hovered: bool) {
        if self.hovered != hovered {
            self.hovered = hovered;
            self.mark_dirty(DirtyFlags::STYLE);
        }
    }

    /// Kicks the transient effect-scale channel; it relaxes back to 1.0.
    pub fn pulse_effect_scale(&mut self, scale: f32) {
        self.effect_scale = sanitize_scalar(scale).max(0.0);
        self.mark_dirty(self.effect_dirty_flags());
    }

    pub fn set_effects_affect_layout(&mut self, enabled: bool) {
        if self.effects_affect_layout != enabled {
            self.effects_affect_layout = enabled;
            self.mark_dirty(DirtyFlags::SIZE);
        }
    }

    fn effect_dirty_flags(&self) -> DirtyFlags {
        if self.effects_affect_layout {
            DirtyFlags::SIZE | DirtyFlags::CONTENT
        } else {
            DirtyFlags::CONTENT
        }
    }

    pub fn is_position_animating(&self) -> bool {
        self.position != self.target_position
    }

    pub fn is_scale_animating(&self) -> bool {
        self.scale != self.target_scale
    }

    pub fn is_animating(&self) -> bool {
        self.is_position_animating()
            || self.is_scale_animating()
            || self.effect_scale != 1.0
            || !self.animations.is_empty()
            || !self.effects.is_empty()
    }

    /// Work left on this node alone, ignoring its children.
    pub(crate) fn has_pending_work(&self) -> bool {
        !self.dirty.is_empty() || self.is_animating()
    }

    /// Multiplier that effects contribute to the measured size.
    pub fn layout_effect_scale(&self) -> f32 {
        if self.effects_affect_layout {
            self.combined_effect.scale * self.effect_scale
        } else {
            1.0
        }
    }

    /// Size as seen by a parent's layout: own scale and, when enabled,
    /// effect scale folded in.
    pub fn reported_size(&self) -> Vec2 {
        self.size * self.scale * self.layout_effect_scale()
    }

    /// Scale the node is drawn at, relative to its parent.
    pub fn render_scale(&self) -> f32 {
        self.scale * self.effect_scale * self.combined_effect.scale
    }

    pub fn add_effect(&mut self, effect: Effect) -> EffectId {
        let id = effect.id();
        self.effects.push(effect);
        self.mark_dirty(DirtyFlags::CONTENT);
        id
    }

    /// Adds `effect`, cancelling and dropping whatever occupies its channel.
    /// Effects without a channel are simply added.
    pub fn add_exclusive_effect(&mut self, effect: Effect) -> EffectId {
        if let Some(channel) = effect.channel_name() {
            let before = self.effects.len();
            self.effects.retain_mut(|existing| {
                if existing.channel_name() == Some(channel) {
                    existing.cancel();
                    false
                } else {
                    true
                }
            });
            if self.effects.len() != before {
                tracing::debug!(channel, curve = effect.curve_name(), "replaced effect on channel");
            }
        }
        self.add_effect(effect)
    }

    pub fn cancel_effect(&mut self, id: EffectId) -> bool {
        match self.effects.iter_mut().find(|e| e.id() == id) {
            Some(effect) => {
                effect.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_effect_channel(&mut self, channel: &str) -> bool {
        let mut found = false;
        for effect in self.effects.iter_mut().filter(|e| e.channel_name() == Some(channel)) {
            effect.cancel();
            found = true;
        }
        found
    }

    pub fn add_animation(&mut self, animation: Animation) -> AnimationId {
        let id = animation.id();
        self.animations.push(animation);
        self.mark_dirty(DirtyFlags::CONTENT);
        id
    }

    pub fn add_exclusive_animation(&mut self, animation: Animation) -> AnimationId {
        if let Some(channel) = animation.channel_name() {
            let before = self.animations.len();
            self.animations.retain(|existing| existing.channel_name() != Some(channel));
            if self.animations.len() != before {
                tracing::debug!(channel, "replaced animation on channel");
            }
        }
        self.add_animation(animation)
    }

    pub fn cancel_animation(&mut self, id: AnimationId) -> bool {
        match self.animations.iter_mut().find(|a| a.id() == id) {
            Some(animation) => {
                animation.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_animation_channel(&mut self, channel: &str) -> bool {
        let mut found = false;
        for animation in self
            .animations
            .iter_mut()
            .filter(|a| a.channel_name() == Some(channel))
        {
            animation.cancel();
            found = true;
        }
        found
    }

    pub(crate) fn step_smoothing(&mut self, dt: f32) {
        if self.is_position_animating() {
            let next = Vec2::new(
                approach(self.position.x, self.target_position.x, POSITION_SMOOTHING, dt, 0.0),
                approach(self.position.y, self.target_position.y, POSITION_SMOOTHING, dt, 0.0),
            );
            self.position = if next.distance(self.target_position) <= POSITION_EPSILON {
                self.target_position
            } else {
                next
            };
            self.mark_dirty(DirtyFlags::POSITION);
        }
        if self.is_scale_animating() {
            self.scale = approach(self.scale, self.target_scale, SCALE_SMOOTHING, dt, SCALE_EPSILON);
            self.mark_dirty(DirtyFlags::SIZE);
        }
        if self.effect_scale != 1.0 {
            self.effect_scale =
                approach(self.effect_scale, 1.0, EFFECT_SCALE_SMOOTHING, dt, SCALE_EPSILON);
            self.mark_dirty(self.effect_dirty_flags());
        }
    }

    pub(crate) fn step_animations(&mut self, dt: f32) {
        if self.animations.is_empty() {
            return;
        }
        let mut running = std::mem::take(&mut self.animations);
        running.retain_mut(|animation| animation.update(dt, self) == AnimationStatus::Running);
        running.append(&mut self.animations);
        self.animations = running;
    }

    pub(crate) fn step_effects(&mut self, dt: f32) {
        if self.effects.is_empty() && self.combined_effect.is_identity() {
            return;
        }
        let before = self.combined_effect;
        self.effects
            .retain_mut(|effect| effect.update(dt) == EffectStatus::Running);
        self.combined_effect = combine_effects(&self.effects);
        if self.combined_effect != before {
            self.mark_dirty(self.effect_dirty_flags());
        }
    }
}
