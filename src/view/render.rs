use glam::Vec2;
use smol_str::SmolStr;

use super::{DebugConfig, NodeId, Rect, SceneTree};
use crate::error::UiError;
use crate::style::Color;

/// Drawing surface the scene renders into. The core only fills rectangles
/// for debug overlays; everything else is up to widgets.
pub trait RenderContext {
    fn fill(&mut self, rect: Rect, color: Color);
    fn draw_string(&mut self, text: &str, position: Vec2, color: Color);
    fn draw_centered_string(&mut self, text: &str, center: Vec2, color: Color) {
        let width = self.measure_string_width(text) as f32;
        let height = self.font_height() as f32;
        self.draw_string(text, center - Vec2::new(width, height) * 0.5, color);
    }
    fn measure_string_width(&self, text: &str) -> i32;
    fn font_height(&self) -> i32;
    fn push_scissor(&mut self, rect: Rect);
    fn pop_scissor(&mut self);
    fn enable_blend(&mut self);
    fn disable_blend(&mut self);
    fn draw_textured_quad(&mut self, quad: &TexturedQuad);
}

#[derive(Clone, Debug, PartialEq)]
pub struct TexturedQuad {
    pub texture: SmolStr,
    pub dest: Rect,
    /// Source region in atlas pixels.
    pub source: Rect,
    pub atlas_size: Vec2,
    pub color: Color,
}

impl TexturedQuad {
    /// Source region as normalized `(u0, v0, u1, v1)`.
    pub fn uv(&self) -> [f32; 4] {
        let atlas = self.atlas_size.max(Vec2::ONE);
        [
            self.source.x / atlas.x,
            self.source.y / atlas.y,
            self.source.right() / atlas.x,
            self.source.bottom() / atlas.y,
        ]
    }
}

/// A sprite region with fixed corners and stretched edges and center.
#[derive(Clone, Debug, PartialEq)]
pub struct NineSlice {
    texture: SmolStr,
    source: Rect,
    atlas_size: Vec2,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl NineSlice {
    pub fn new(
        texture: impl Into<SmolStr>,
        source: Rect,
        atlas_size: Vec2,
        [left, top, right, bottom]: [f32; 4],
    ) -> Result<Self, UiError> {
        if [left, top, right, bottom]
            .iter()
            .any(|edge| !edge.is_finite() || *edge < 0.0)
        {
            return Err(UiError::InvalidNineSlice("edge sizes must be finite and >= 0"));
        }
        if left + right > source.width || top + bottom > source.height {
            return Err(UiError::InvalidNineSlice("edges exceed the source region"));
        }
        Ok(Self {
            texture: texture.into(),
            source,
            atlas_size,
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn edges(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

/// Splits `[start, start + len]` into three spans with the given edge
/// lengths, shrinking the edges when they don't fit.
fn spans(start: f32, len: f32, lead: f32, trail: f32) -> [(f32, f32); 3] {
    let shrink = if lead + trail > len && lead + trail > 0.0 {
        len / (lead + trail)
    } else {
        1.0
    };
    let (lead, trail) = (lead * shrink, trail * shrink);
    [
        (start, lead),
        (start + lead, (len - lead - trail).max(0.0)),
        (start + len - trail, trail),
    ]
}

pub fn draw_nine_slice(ctx: &mut dyn RenderContext, slice: &NineSlice, dest: Rect, color: Color) {
    let src_x = spans(slice.source.x, slice.source.width, slice.left, slice.right);
    let src_y = spans(slice.source.y, slice.source.height, slice.top, slice.bottom);
    let dst_x = spans(dest.x, dest.width, slice.left, slice.right);
    let dst_y = spans(dest.y, dest.height, slice.top, slice.bottom);
    for row in 0..3 {
        for col in 0..3 {
            ctx.draw_textured_quad(&TexturedQuad {
                texture: slice.texture.clone(),
                dest: Rect::new(dst_x[col].0, dst_y[row].0, dst_x[col].1, dst_y[row].1),
                source: Rect::new(src_x[col].0, src_y[row].0, src_x[col].1, src_y[row].1),
                atlas_size: slice.atlas_size,
                color,
            });
        }
    }
}

/// Where and how a node draws this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderFrame {
    /// Screen-space rectangle with visual-only effect offset and scale applied.
    pub bounds: Rect,
    pub scale: f32,
    /// Accumulated rotation in degrees.
    pub rotation: f32,
    /// Accumulated alpha multiplier.
    pub alpha: f32,
}

impl RenderFrame {
    pub fn tint(&self, color: Color) -> Color {
        color.fade(self.alpha)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Fill { rect: Rect, color: Color },
    Text { text: SmolStr, position: Vec2, color: Color },
    PushScissor(Rect),
    PopScissor,
    EnableBlend,
    DisableBlend,
    Quad(TexturedQuad),
}

/// Headless context that records every call; for tests and tooling.
#[derive(Clone, Debug)]
pub struct RecordingContext {
    pub commands: Vec<DrawCommand>,
    glyph_width: i32,
    font_height: i32,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::with_metrics(6, 9)
    }

    pub fn with_metrics(glyph_width: i32, font_height: i32) -> Self {
        Self {
            commands: Vec::new(),
            glyph_width,
            font_height,
        }
    }

    pub fn fills(&self) -> impl Iterator<Item = (Rect, Color)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Fill { rect, color } => Some((*rect, *color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn quads(&self) -> impl Iterator<Item = &TexturedQuad> + '_ {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Quad(quad) => Some(quad),
            _ => None,
        })
    }
}

impl RenderContext for RecordingContext {
    fn fill(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Fill { rect, color });
    }

    fn draw_string(&mut self, text: &str, position: Vec2, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.into(),
            position,
            color,
        });
    }

    fn measure_string_width(&self, text: &str) -> i32 {
        text.chars().count() as i32 * self.glyph_width
    }

    fn font_height(&self) -> i32 {
        self.font_height
    }

    fn push_scissor(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::PushScissor(rect));
    }

    fn pop_scissor(&mut self) {
        self.commands.push(DrawCommand::PopScissor);
    }

    fn enable_blend(&mut self) {
        self.commands.push(DrawCommand::EnableBlend);
    }

    fn disable_blend(&mut self) {
        self.commands.push(DrawCommand::DisableBlend);
    }

    fn draw_textured_quad(&mut self, quad: &TexturedQuad) {
        self.commands.push(DrawCommand::Quad(quad.clone()));
    }
}

fn outline(ctx: &mut dyn RenderContext, rect: Rect, thickness: f32, color: Color) {
    let t = thickness.min(rect.width * 0.5).min(rect.height * 0.5).max(0.0);
    ctx.fill(Rect::new(rect.x, rect.y, rect.width, t), color);
    ctx.fill(Rect::new(rect.x, rect.bottom() - t, rect.width, t), color);
    ctx.fill(Rect::new(rect.x, rect.y + t, t, rect.height - t * 2.0), color);
    ctx.fill(Rect::new(rect.right() - t, rect.y + t, t, rect.height - t * 2.0), color);
}

#[derive(Clone, Copy)]
struct Inherited {
    rotation: f32,
    alpha: f32,
}

impl SceneTree {
    /// Draws the subtree at `root` back-to-front. Subtrees whose visual
    /// bounds miss `viewport` are skipped.
    pub fn render(
        &self,
        root: NodeId,
        ctx: &mut dyn RenderContext,
        debug: &DebugConfig,
        viewport: Rect,
    ) {
        let _span = tracing::trace_span!("render", ?root).entered();
        self.render_node(
            root,
            ctx,
            debug,
            viewport,
            Inherited {
                rotation: 0.0,
                alpha: 1.0,
            },
        );
    }

    fn render_node(
        &self,
        id: NodeId,
        ctx: &mut dyn RenderContext,
        debug: &DebugConfig,
        viewport: Rect,
        inherited: Inherited,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let state = &node.state;
        if !state.is_visible() {
            return;
        }
        let (Some(bounds), Some((_, parent_scale))) = (
            self.bounds(id),
            node.parent
                .map_or(Some((Vec2::ZERO, 1.0)), |parent| self.global_transform(parent)),
        ) else {
            return;
        };

        let effect = state.combined_effect();
        let visual = if state.effects_affect_layout() {
            bounds
        } else {
            bounds
                .translated(effect.position_offset * parent_scale)
                .scaled_about_center(state.effect_scale() * effect.scale)
        };
        if !visual.intersects(viewport) {
            if debug.show_culled {
                outline(ctx, visual, 1.0, Color::DEBUG_CULLED);
            }
            return;
        }

        let frame = RenderFrame {
            bounds: visual,
            scale: visual.width / state.size().x.max(f32::EPSILON),
            rotation: inherited.rotation + effect.rotation,
            alpha: (inherited.alpha * effect.alpha).clamp(0.0, 1.0),
        };
        node.widget.render_self(state, &frame, ctx);

        if let Some(container) = node.container.as_ref() {
            let scale = frame.scale;
            if debug.show_padding && container.layout.padding_value() > 0.0 {
                outline(
                    ctx,
                    visual,
                    container.layout.padding_value() * scale,
                    Color::DEBUG_PADDING,
                );
            }
            if debug.show_grid {
                for &child in &container.children {
                    if let Some(cell) = container.cache.child_bounds.get(&child) {
                        let cell = Rect::new(
                            visual.x + cell.x * scale,
                            visual.y + cell.y * scale,
                            cell.width * scale,
                            cell.height * scale,
                        );
                        outline(ctx, cell, 1.0, Color::DEBUG_GRID);
                    }
                }
            }
            let inherited = Inherited {
                rotation: frame.rotation,
                alpha: frame.alpha,
            };
            for &child in &container.children {
                self.render_node(child, ctx, debug, viewport, inherited);
            }
        }

        if debug.show_bounds {
            outline(ctx, bounds, 1.0, Color::DEBUG_BOUNDS);
        }
    }
}
