use glam::Vec2;

use crate::view::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    target_id: NodeId,
    current_target_id: NodeId,
    propagation_stopped: bool,
}

impl EventMeta {
    pub fn new(target_id: NodeId) -> Self {
        Self {
            target_id,
            current_target_id: target_id,
            propagation_stopped: false,
        }
    }

    /// Deepest node the pointer resolved to.
    pub fn target_id(&self) -> NodeId {
        self.target_id
    }

    /// Node whose handler is currently running.
    pub fn current_target_id(&self) -> NodeId {
        self.current_target_id
    }

    pub(crate) fn set_current_target_id(&mut self, current_target_id: NodeId) {
        self.current_target_id = current_target_id;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub meta: EventMeta,
    pub position: Vec2,
    pub button: MouseButton,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub meta: EventMeta,
    pub position: Vec2,
    pub delta: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverEvent {
    pub meta: EventMeta,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    Click(ClickEvent),
    Scroll(ScrollEvent),
    HoverEnter(HoverEvent),
    HoverExit(HoverEvent),
}

impl UiEvent {
    pub fn click(target: NodeId, position: Vec2, button: MouseButton) -> Self {
        Self::Click(ClickEvent {
            meta: EventMeta::new(target),
            position,
            button,
        })
    }

    pub fn scroll(target: NodeId, position: Vec2, delta: Vec2) -> Self {
        Self::Scroll(ScrollEvent {
            meta: EventMeta::new(target),
            position,
            delta,
        })
    }

    pub fn hover_enter(target: NodeId, position: Vec2) -> Self {
        Self::HoverEnter(HoverEvent {
            meta: EventMeta::new(target),
            position,
        })
    }

    pub fn hover_exit(target: NodeId, position: Vec2) -> Self {
        Self::HoverExit(HoverEvent {
            meta: EventMeta::new(target),
            position,
        })
    }

    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::Click(event) => &event.meta,
            Self::Scroll(event) => &event.meta,
            Self::HoverEnter(event) | Self::HoverExit(event) => &event.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut EventMeta {
        match self {
            Self::Click(event) => &mut event.meta,
            Self::Scroll(event) => &mut event.meta,
            Self::HoverEnter(event) | Self::HoverExit(event) => &mut event.meta,
        }
    }

    pub fn position(&self) -> Vec2 {
        match self {
            Self::Click(event) => event.position,
            Self::Scroll(event) => event.position,
            Self::HoverEnter(event) | Self::HoverExit(event) => event.position,
        }
    }

    /// Marks the event handled; dispatch stops after the current handler.
    pub fn consume(&mut self) {
        self.meta_mut().stop_propagation();
    }

    pub fn is_consumed(&self) -> bool {
        self.meta().propagation_stopped()
    }
}
