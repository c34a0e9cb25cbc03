use std::any::Any;

use super::NodeState;
use super::render::{RenderContext, RenderFrame};
use crate::ui::UiEvent;

pub trait Updatable {
    /// Widget-specific per-tick logic. Runs after the node's own animation
    /// step and dirty hooks; flags it sets are seen on the next tick.
    fn on_update(&mut self, _node: &mut NodeState, _dt: f32) {}
    fn on_position_changed(&mut self, _node: &mut NodeState) {}
    fn on_size_changed(&mut self, _node: &mut NodeState) {}
    fn on_visibility_changed(&mut self, _node: &mut NodeState) {}
}

pub trait Renderable {
    fn render_self(&self, _node: &NodeState, _frame: &RenderFrame, _ctx: &mut dyn RenderContext) {
    }
}

pub trait EventHandler {
    /// Returns true when the event was handled.
    fn on_event(&mut self, _node: &mut NodeState, _event: &mut UiEvent) -> bool {
        false
    }
}

pub trait Widget: Updatable + Renderable + EventHandler + Any {
    fn default_debug_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Draws nothing and handles nothing. Backs plain containers and spacers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Panel;

impl Updatable for Panel {}
impl Renderable for Panel {}
impl EventHandler for Panel {}

impl Widget for Panel {
    fn default_debug_name(&self) -> &'static str {
        "Panel"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
