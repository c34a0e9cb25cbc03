use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

use glam::Vec2;

use super::{DebugConfig, NodeId, Rect, RenderContext, SceneTree, debug};
use crate::ui::{MouseButton, UiEvent};

pub const DEFAULT_HOVER_COOLDOWN: Duration = Duration::from_millis(80);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenConfig {
    hover_cooldown: Duration,
    auto_center: bool,
    auto_center_threshold: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenConfig {
    pub const fn new() -> Self {
        Self {
            hover_cooldown: DEFAULT_HOVER_COOLDOWN,
            auto_center: false,
            auto_center_threshold: 1.0,
        }
    }

    /// Minimum gap between consecutive hover transitions.
    pub const fn hover_cooldown(mut self, cooldown: Duration) -> Self {
        self.hover_cooldown = cooldown;
        self
    }

    pub const fn auto_center(mut self, enabled: bool) -> Self {
        self.auto_center = enabled;
        self
    }

    /// Size change, in pixels, that triggers re-centering the root.
    pub const fn auto_center_threshold(mut self, pixels: f32) -> Self {
        self.auto_center_threshold = pixels;
        self
    }

    pub const fn hover_cooldown_value(&self) -> Duration {
        self.hover_cooldown
    }

    pub const fn is_auto_center(&self) -> bool {
        self.auto_center
    }
}

/// Wall-clock source for hover debouncing. Animation time comes from the
/// `dt` passed to [`Screen::tick`], never from here.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.0.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingHover {
    target: Option<NodeId>,
    since: Duration,
}

/// Top-level driver: owns the tree, ticks the root and routes pointer input.
pub struct Screen<C: Clock = SystemClock> {
    tree: SceneTree,
    root: NodeId,
    config: ScreenConfig,
    clock: C,
    viewport: Vec2,
    pointer: Option<Vec2>,
    hovered: Option<NodeId>,
    pending_hover: Option<PendingHover>,
    last_hover_transition: Option<Duration>,
    last_centered_size: Option<Vec2>,
    debug: DebugConfig,
}

impl Screen<SystemClock> {
    pub fn new(tree: SceneTree, root: NodeId, config: ScreenConfig) -> Self {
        Self::with_clock(tree, root, config, SystemClock::default())
    }
}

impl<C: Clock> Screen<C> {
    pub fn with_clock(tree: SceneTree, root: NodeId, config: ScreenConfig, clock: C) -> Self {
        let viewport = tree.screen_size();
        Self {
            tree,
            root,
            config,
            clock,
            viewport,
            pointer: None,
            hovered: None,
            pending_hover: None,
            last_hover_transition: None,
            last_centered_size: None,
            debug: debug::global(),
        }
    }

    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SceneTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    pub fn debug(&self) -> DebugConfig {
        self.debug
    }

    pub fn set_debug(&mut self, debug: DebugConfig) {
        self.debug = debug;
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        if self.viewport == size {
            return;
        }
        self.viewport = size;
        self.tree.set_screen_size(size);
        self.last_centered_size = None;
    }

    pub fn tick(&mut self, dt: f32) {
        self.process_pending_hover();
        self.tree.update(self.root, dt);
        if self.config.auto_center {
            self.auto_center();
        }
    }

    fn auto_center(&mut self) {
        let Some(size) = self.tree.node(self.root).map(|node| node.reported_size()) else {
            return;
        };
        let threshold = self.config.auto_center_threshold;
        let changed = self
            .last_centered_size
            .is_none_or(|last| (size - last).abs().max_element() > threshold);
        if changed {
            self.tree.set_position(self.root, (self.viewport - size) * 0.5);
            self.last_centered_size = Some(size);
        }
    }

    pub fn on_mouse_move(&mut self, position: Vec2) {
        self.pointer = Some(position);
        let target = self.tree.find_element_at(self.root, position);
        self.observe_hover(target);
    }

    pub fn on_mouse_click(&mut self, position: Vec2, button: MouseButton) -> bool {
        let Some(target) = self.tree.find_element_at(self.root, position) else {
            return false;
        };
        let mut event = UiEvent::click(target, position, button);
        self.tree.dispatch_event(self.root, &mut event)
    }

    pub fn on_mouse_scroll(&mut self, position: Vec2, delta: Vec2) -> bool {
        let Some(target) = self.tree.find_element_at(self.root, position) else {
            return false;
        };
        let mut event = UiEvent::scroll(target, position, delta);
        self.tree.dispatch_event(self.root, &mut event)
    }

    pub fn render(&self, ctx: &mut dyn RenderContext) {
        let viewport = Rect::from_origin_size(Vec2::ZERO, self.viewport);
        self.tree.render(self.root, ctx, &self.debug, viewport);
    }

    /// Hover changes are deferred until the cooldown has passed since both
    /// the first unapplied change and the last transition. Later changes
    /// inside the window replace the pending target.
    fn observe_hover(&mut self, target: Option<NodeId>) {
        if target == self.hovered {
            self.pending_hover = None;
            return;
        }
        let since = self
            .pending_hover
            .map_or_else(|| self.clock.now(), |pending| pending.since);
        self.pending_hover = Some(PendingHover { target, since });
    }

    fn process_pending_hover(&mut self) {
        let Some(pending) = self.pending_hover else {
            return;
        };
        let now = self.clock.now();
        let cooldown = self.config.hover_cooldown;
        let settled = now.saturating_sub(pending.since) >= cooldown;
        let cooled = self
            .last_hover_transition
            .is_none_or(|last| now.saturating_sub(last) >= cooldown);
        if settled && cooled {
            self.pending_hover = None;
            self.apply_hover(pending.target, now);
        }
    }

    fn apply_hover(&mut self, target: Option<NodeId>, now: Duration) {
        let target = target.filter(|&id| self.tree.contains(id));
        let previous = self.hovered.filter(|&id| self.tree.contains(id));
        if target == previous {
            self.hovered = target;
            return;
        }
        tracing::debug!(?previous, ?target, "hover transition");
        let position = self.pointer.unwrap_or(Vec2::ZERO);
        if let Some(previous) = previous {
            self.tree.with_node(previous, |node| node.set_hovered(false));
            self.tree
                .deliver_event(previous, &mut UiEvent::hover_exit(previous, position));
        }
        if let Some(target) = target {
            self.tree.with_node(target, |node| node.set_hovered(true));
            self.tree
                .deliver_event(target, &mut UiEvent::hover_enter(target, position));
        }
        self.hovered = target;
        self.last_hover_transition = Some(now);
    }
}
