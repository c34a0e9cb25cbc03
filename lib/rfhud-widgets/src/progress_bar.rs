use std::any::Any;

use rfhud::effect::{Effect, TransformDelta};
use rfhud::transition::{Animation, Keyframe, TimeFunction};
use rfhud::view::{
    DirtyFlags, EventHandler, NodeState, Rect, Renderable, RenderContext, RenderFrame, Updatable,
    Widget,
};

use crate::Theme;

const DISPLAY_EASE_SECONDS: f32 = 0.25;
const FLASH_CHANNEL: &str = "progress_flash";

/// Horizontal fill bar. The drawn fill eases toward the latest value.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    value: f32,
    displayed: f32,
    theme: Theme,
    ease: bool,
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ProgressBar {
    pub fn new(value: f32) -> Self {
        let value = clamp_unit(value);
        Self {
            value,
            displayed: value,
            theme: Theme::default(),
            ease: true,
        }
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// With easing off the fill jumps straight to new values.
    pub fn ease(mut self, ease: bool) -> Self {
        self.ease = ease;
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    pub fn set_value(&mut self, node: &mut NodeState, value: f32) {
        let value = clamp_unit(value);
        if self.value == value {
            return;
        }
        self.value = value;
        if !self.ease {
            self.displayed = value;
        }
        node.mark_dirty(DirtyFlags::CONTENT);
    }

    /// Dims the bar and fades it back in, driving the effect weight with a
    /// keyframe animation.
    pub fn flash(&self, node: &mut NodeState) {
        let dim = Effect::constant(TransformDelta::faded(0.4))
            .channel(FLASH_CHANNEL)
            .duration(DISPLAY_EASE_SECONDS);
        let weight = dim.shared_weight();
        node.add_exclusive_effect(dim);
        node.add_exclusive_animation(
            Animation::on_param(
                [
                    Keyframe::new(0.0, 1.0),
                    Keyframe::new(DISPLAY_EASE_SECONDS, 0.0).timing(TimeFunction::EaseOut),
                ],
                weight,
            )
            .channel(FLASH_CHANNEL),
        );
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl Updatable for ProgressBar {
    fn on_update(&mut self, node: &mut NodeState, dt: f32) {
        if self.displayed == self.value {
            return;
        }
        let step = dt / DISPLAY_EASE_SECONDS;
        let delta = self.value - self.displayed;
        self.displayed = if delta.abs() <= step {
            self.value
        } else {
            self.displayed + step.copysign(delta)
        };
        node.mark_dirty(DirtyFlags::CONTENT);
    }
}

impl EventHandler for ProgressBar {}

impl Renderable for ProgressBar {
    fn render_self(&self, _node: &NodeState, frame: &RenderFrame, ctx: &mut dyn RenderContext) {
        let bounds = frame.bounds;
        ctx.fill(bounds, frame.tint(self.theme.track));
        if self.displayed > 0.0 {
            let fill = Rect::new(bounds.x, bounds.y, bounds.width * self.displayed, bounds.height);
            ctx.fill(fill, frame.tint(self.theme.accent));
        }
    }
}

impl Widget for ProgressBar {
    fn default_debug_name(&self) -> &'static str {
        "ProgressBar"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use rfhud::view::{DebugConfig, NodeId, RecordingContext, SceneTree};

    use super::*;

    fn bar(tree: &mut SceneTree, widget: ProgressBar) -> NodeId {
        let id = tree.create_element(widget);
        tree.set_size(id, Vec2::new(100.0, 6.0));
        tree.update(id, 0.0);
        id
    }

    #[test]
    fn displayed_value_eases_toward_target() {
        let mut tree = SceneTree::new();
        let id = bar(&mut tree, ProgressBar::new(0.0));
        tree.with_widget::<ProgressBar, _>(id, |bar, node| bar.set_value(node, 0.5));
        tree.update(id, 0.05);
        let shown = tree.widget::<ProgressBar>(id).unwrap().displayed();
        assert!(shown > 0.0 && shown < 0.5);

        for _ in 0..30 {
            tree.update(id, 0.05);
        }
        assert_eq!(tree.widget::<ProgressBar>(id).unwrap().displayed(), 0.5);
        assert!(!tree.needs_update(id));
    }

    #[test]
    fn values_are_clamped() {
        let mut tree = SceneTree::new();
        let id = bar(&mut tree, ProgressBar::new(3.0).ease(false));
        assert_eq!(tree.widget::<ProgressBar>(id).unwrap().value(), 1.0);
        tree.with_widget::<ProgressBar, _>(id, |bar, node| bar.set_value(node, f32::NAN));
        assert_eq!(tree.widget::<ProgressBar>(id).unwrap().displayed(), 0.0);
    }

    #[test]
    fn fill_width_tracks_displayed_fraction() {
        let mut tree = SceneTree::new();
        let id = bar(&mut tree, ProgressBar::new(0.25));
        let mut ctx = RecordingContext::new();
        tree.render(id, &mut ctx, &DebugConfig::new(), Rect::new(0.0, 0.0, 200.0, 200.0));
        let fills: Vec<_> = ctx.fills().collect();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[1].0, Rect::new(0.0, 0.0, 25.0, 6.0));
    }

    #[test]
    fn flash_runs_to_completion() {
        let mut tree = SceneTree::new();
        let id = bar(&mut tree, ProgressBar::new(0.5));
        tree.with_widget::<ProgressBar, _>(id, |bar, node| bar.flash(node));
        let node = tree.node(id).unwrap();
        assert_eq!(node.effects().len(), 1);
        assert_eq!(node.animation_count(), 1);
        tree.update(id, 0.02);
        assert!(tree.node(id).unwrap().combined_effect().alpha < 1.0);
        for _ in 0..30 {
            tree.update(id, 0.02);
        }
        let node = tree.node(id).unwrap();
        assert!(node.effects().is_empty());
        assert_eq!(node.animation_count(), 0);
    }
}
