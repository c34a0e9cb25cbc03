use std::any::Any;
use std::fmt;

use rfhud::effect::Effect;
use rfhud::ui::{MouseButton, UiEvent};
use rfhud::view::{
    DirtyFlags, EventHandler, NodeState, Renderable, RenderContext, RenderFrame, Updatable, Widget,
};
use smol_str::SmolStr;

use crate::Theme;

/// How long the pressed look is held after a click.
pub const PRESS_FEEDBACK_SECONDS: f32 = 0.12;

type ClickHandler = Box<dyn FnMut()>;

pub struct Button {
    label: SmolStr,
    theme: Theme,
    disabled: bool,
    pressed_timer: f32,
    on_click: Option<ClickHandler>,
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("label", &self.label)
            .field("disabled", &self.disabled)
            .field("pressed_timer", &self.pressed_timer)
            .finish()
    }
}

impl Button {
    pub fn new(label: impl Into<SmolStr>) -> Self {
        Self {
            label: label.into(),
            theme: Theme::default(),
            disabled: false,
            pressed_timer: 0.0,
            on_click: None,
        }
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn on_click<F>(mut self, handler: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_click = Some(Box::new(handler));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_timer > 0.0
    }

    pub fn set_disabled(&mut self, node: &mut NodeState, disabled: bool) {
        if self.disabled != disabled {
            self.disabled = disabled;
            node.mark_dirty(DirtyFlags::STYLE);
        }
    }
}

impl Updatable for Button {
    fn on_update(&mut self, node: &mut NodeState, dt: f32) {
        if self.pressed_timer > 0.0 {
            self.pressed_timer = (self.pressed_timer - dt).max(0.0);
            // Keeps the node ticking until the timer runs out.
            node.mark_dirty(DirtyFlags::STYLE);
        }
    }
}

impl EventHandler for Button {
    fn on_event(&mut self, node: &mut NodeState, event: &mut UiEvent) -> bool {
        match event {
            UiEvent::Click(click) if click.button == MouseButton::Left && !self.disabled => {
                self.pressed_timer = PRESS_FEEDBACK_SECONDS;
                node.add_exclusive_effect(Effect::click_bounce());
                node.mark_dirty(DirtyFlags::STYLE);
                tracing::debug!(label = %self.label, "button clicked");
                if let Some(handler) = self.on_click.as_mut() {
                    handler();
                }
                click.meta.stop_propagation();
                true
            }
            UiEvent::HoverEnter(_) | UiEvent::HoverExit(_) => {
                node.mark_dirty(DirtyFlags::STYLE);
                false
            }
            _ => false,
        }
    }
}

impl Renderable for Button {
    fn render_self(&self, node: &NodeState, frame: &RenderFrame, ctx: &mut dyn RenderContext) {
        let background = if self.disabled {
            self.theme.surface_disabled
        } else if self.is_pressed() {
            self.theme.surface_pressed
        } else if node.is_hovered() {
            self.theme.surface_hover
        } else {
            self.theme.surface
        };
        let text = if self.disabled {
            self.theme.text_disabled
        } else {
            self.theme.text
        };
        ctx.fill(frame.bounds, frame.tint(background));
        ctx.draw_centered_string(&self.label, frame.bounds.center(), frame.tint(text));
    }
}

impl Widget for Button {
    fn default_debug_name(&self) -> &'static str {
        "Button"
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
    use std::cell::Cell;
    use std::rc::Rc;

    use glam::Vec2;
    use rfhud::effect::CLICK_BOUNCE_DURATION;
    use rfhud::view::{
        BoxLayout, ManualClock, NodeId, Rect, RecordingContext, SceneTree, Screen,
        ScreenConfig,
    };

    use super::*;

    fn screen_with_button(button: Button) -> (Screen<ManualClock>, NodeId) {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox());
        let id = tree.create_element(button);
        tree.set_size(id, Vec2::new(60.0, 20.0));
        tree.add_child(root, id).unwrap();
        let mut screen = Screen::with_clock(tree, root, ScreenConfig::new(), ManualClock::new());
        screen.set_viewport_size(Vec2::new(200.0, 100.0));
        screen.tick(0.0);
        (screen, id)
    }

    #[test]
    fn click_runs_handler_and_bounces() {
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let (mut screen, id) =
            screen_with_button(Button::new("OK").on_click(move || counter.set(counter.get() + 1)));

        assert!(screen.on_mouse_click(Vec2::new(10.0, 10.0), MouseButton::Left));
        assert_eq!(clicks.get(), 1);
        let node = screen.tree().node(id).unwrap();
        assert_eq!(node.effects().len(), 1);
        assert!(screen.tree().widget::<Button>(id).unwrap().is_pressed());

        // A second click replaces the running bounce instead of stacking.
        screen.on_mouse_click(Vec2::new(10.0, 10.0), MouseButton::Left);
        assert_eq!(screen.tree().node(id).unwrap().effects().len(), 1);
    }

    #[test]
    fn click_bounce_settles_back_to_rest() {
        let (mut screen, id) = screen_with_button(Button::new("OK"));
        screen.on_mouse_click(Vec2::new(10.0, 10.0), MouseButton::Left);
        screen.tick(0.1);
        assert!(screen.tree().node(id).unwrap().render_scale() < 1.0);

        let mut elapsed = 0.1;
        while elapsed < CLICK_BOUNCE_DURATION + 0.02 {
            screen.tick(0.02);
            elapsed += 0.02;
        }
        let node = screen.tree().node(id).unwrap();
        assert!(node.effects().is_empty());
        assert_eq!(node.render_scale(), 1.0);
        assert!(!screen.tree().widget::<Button>(id).unwrap().is_pressed());
    }

    #[test]
    fn disabled_button_ignores_clicks() {
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let (mut screen, id) = screen_with_button(
            Button::new("OK")
                .disabled(true)
                .on_click(move || counter.set(counter.get() + 1)),
        );
        assert!(!screen.on_mouse_click(Vec2::new(10.0, 10.0), MouseButton::Left));
        assert_eq!(clicks.get(), 0);
        assert!(screen.tree().node(id).unwrap().effects().is_empty());
    }

    #[test]
    fn right_click_is_not_handled() {
        let (mut screen, _) = screen_with_button(Button::new("OK"));
        assert!(!screen.on_mouse_click(Vec2::new(10.0, 10.0), MouseButton::Right));
    }

    #[test]
    fn renders_background_and_label() {
        let (screen, _) = screen_with_button(Button::new("Go"));
        let mut ctx = RecordingContext::new();
        screen.render(&mut ctx);
        let fills: Vec<_> = ctx.fills().collect();
        assert_eq!(fills, vec![(Rect::new(0.0, 0.0, 60.0, 20.0), Theme::default().surface)]);
        assert_eq!(ctx.texts().collect::<Vec<_>>(), vec!["Go"]);
    }
}
