use std::any::Any;

use glam::Vec2;
use rfhud::style::Color;
use rfhud::view::{
    DirtyFlags, EventHandler, NodeState, Renderable, RenderContext, RenderFrame, Updatable, Widget,
};
use smol_str::SmolStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// Single line of text. [`Label::measure`] sizes the node to the text.
#[derive(Clone, Debug)]
pub struct Label {
    text: SmolStr,
    color: Color,
    align: TextAlign,
    measured: Option<Vec2>,
}

impl Label {
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Self {
            text: text.into(),
            color: Color::WHITE,
            align: TextAlign::Left,
            measured: None,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, node: &mut NodeState, text: impl Into<SmolStr>) {
        let text = text.into();
        if self.text != text {
            self.text = text;
            self.measured = None;
            node.mark_dirty(DirtyFlags::CONTENT);
        }
    }

    pub fn set_color(&mut self, node: &mut NodeState, color: Color) {
        if self.color != color {
            self.color = color;
            node.mark_dirty(DirtyFlags::STYLE);
        }
    }

    /// Resizes the node to fit the text under `ctx`'s font metrics.
    pub fn measure(&mut self, node: &mut NodeState, ctx: &dyn RenderContext) {
        let size = Vec2::new(
            ctx.measure_string_width(&self.text) as f32,
            ctx.font_height() as f32,
        );
        self.measured = Some(size);
        node.set_size(size);
    }

    pub fn is_measured(&self) -> bool {
        self.measured.is_some()
    }
}

impl Updatable for Label {}
impl EventHandler for Label {}

impl Renderable for Label {
    fn render_self(&self, _node: &NodeState, frame: &RenderFrame, ctx: &mut dyn RenderContext) {
        let color = frame.tint(self.color);
        match self.align {
            TextAlign::Left => ctx.draw_string(&self.text, frame.bounds.origin(), color),
            TextAlign::Center => ctx.draw_centered_string(&self.text, frame.bounds.center(), color),
        }
    }
}

impl Widget for Label {
    fn default_debug_name(&self) -> &'static str {
        "Label"
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
    use super::*;
    use rfhud::view::{DebugConfig, Rect, RecordingContext, SceneTree};

    #[test]
    fn measure_sizes_node_to_text() {
        let mut tree = SceneTree::new();
        let id = tree.create_element(Label::new("hello"));
        let ctx = RecordingContext::with_metrics(6, 9);
        tree.with_widget::<Label, _>(id, |label, node| label.measure(node, &ctx));
        assert_eq!(tree.node(id).unwrap().size(), Vec2::new(30.0, 9.0));
    }

    #[test]
    fn set_text_marks_content_and_drops_measurement() {
        let mut tree = SceneTree::new();
        let id = tree.create_element(Label::new("a"));
        tree.update(id, 0.0);
        let ctx = RecordingContext::new();
        tree.with_widget::<Label, _>(id, |label, node| {
            label.measure(node, &ctx);
            label.set_text(node, "bb");
            assert!(!label.is_measured());
        });
        assert!(tree.node(id).unwrap().dirty_flags().contains(DirtyFlags::CONTENT));
    }

    #[test]
    fn renders_text_at_origin() {
        let mut tree = SceneTree::new();
        let id = tree.create_element(Label::new("hp").color(Color::rgb(255, 0, 0)));
        tree.set_position(id, Vec2::new(4.0, 6.0));
        tree.set_size(id, Vec2::new(12.0, 9.0));
        let mut ctx = RecordingContext::new();
        tree.render(id, &mut ctx, &DebugConfig::new(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(ctx.texts().collect::<Vec<_>>(), vec!["hp"]);
        assert_eq!(tree.debug_name(id), Some("Label"));
    }
}
