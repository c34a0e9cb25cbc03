use std::any::Any;

use glam::Vec2;
use rfhud::style::Color;
use rfhud::view::{
    DirtyFlags, EventHandler, NineSlice, NodeState, Rect, Renderable, RenderContext, RenderFrame,
    TexturedQuad, Updatable, Widget, draw_nine_slice,
};
use smol_str::SmolStr;

/// Atlas sprite for an item, with an optional slot frame behind it and a
/// stack count in the bottom-right corner.
#[derive(Clone, Debug)]
pub struct ItemIcon {
    texture: SmolStr,
    source: Rect,
    atlas_size: Vec2,
    frame: Option<NineSlice>,
    inset: f32,
    count: u32,
    tint: Color,
}

impl ItemIcon {
    pub fn new(texture: impl Into<SmolStr>, source: Rect, atlas_size: Vec2) -> Self {
        Self {
            texture: texture.into(),
            source,
            atlas_size,
            frame: None,
            inset: 0.0,
            count: 1,
            tint: Color::WHITE,
        }
    }

    /// Draws `frame` behind the sprite and shrinks the sprite by `inset`.
    pub fn frame(mut self, frame: NineSlice, inset: f32) -> Self {
        self.frame = Some(frame);
        self.inset = inset.max(0.0);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn stack_count(&self) -> u32 {
        self.count
    }

    pub fn set_count(&mut self, node: &mut NodeState, count: u32) {
        if self.count != count {
            self.count = count;
            node.mark_dirty(DirtyFlags::CONTENT);
        }
    }

    pub fn set_tint(&mut self, node: &mut NodeState, tint: Color) {
        if self.tint != tint {
            self.tint = tint;
            node.mark_dirty(DirtyFlags::STYLE);
        }
    }
}

impl Updatable for ItemIcon {}
impl EventHandler for ItemIcon {}

impl Renderable for ItemIcon {
    fn render_self(&self, _node: &NodeState, frame: &RenderFrame, ctx: &mut dyn RenderContext) {
        let bounds = frame.bounds;
        ctx.enable_blend();
        if let Some(slot) = &self.frame {
            draw_nine_slice(ctx, slot, bounds, frame.tint(Color::WHITE));
        }
        ctx.draw_textured_quad(&TexturedQuad {
            texture: self.texture.clone(),
            dest: bounds.inset(self.inset * frame.scale),
            source: self.source,
            atlas_size: self.atlas_size,
            color: frame.tint(self.tint),
        });
        ctx.disable_blend();

        if self.count > 1 {
            let text = self.count.to_string();
            let width = ctx.measure_string_width(&text) as f32;
            let height = ctx.font_height() as f32;
            let position = Vec2::new(bounds.right() - width, bounds.bottom() - height);
            ctx.draw_string(&text, position, frame.tint(Color::WHITE));
        }
    }
}

impl Widget for ItemIcon {
    fn default_debug_name(&self) -> &'static str {
        "ItemIcon"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
