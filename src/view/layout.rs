use glam::Vec2;
use rustc_hash::FxHashMap;

use super::{Axis, DirtyFlags, NodeId, Rect, SceneTree};
use crate::error::UiError;

/// Cross-axis placement. Reads as Left/Center/Right in a vbox and
/// Top/Center/Bottom in an hbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
}

/// Rounds a size up to `offset + multiple * k`, the smallest such value not
/// below the input. Used to line container edges up with tiled sprite art.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantization {
    multiple: f32,
    offset: f32,
}

impl Quantization {
    /// `multiple == 0` clears quantization and yields `Ok(None)`.
    pub fn new(axis: Axis, multiple: f32, offset: f32) -> Result<Option<Self>, UiError> {
        let valid = multiple.is_finite() && offset.is_finite() && multiple >= 0.0 && offset >= 0.0;
        if !valid {
            return Err(UiError::InvalidQuantization {
                axis,
                multiple,
                offset,
            });
        }
        if multiple == 0.0 {
            return Ok(None);
        }
        Ok(Some(Self { multiple, offset }))
    }

    pub fn multiple(self) -> f32 {
        self.multiple
    }

    pub fn offset(self) -> f32 {
        self.offset
    }

    pub fn apply(self, size: f32) -> f32 {
        if size <= self.offset {
            return self.offset;
        }
        let mut steps = ((size - self.offset) / self.multiple).ceil().max(0.0);
        // The division can land a hair above an exact hit (50 = 8 + 7 * 6)
        // or a hair below a miss; correct against the size itself.
        if steps > 0.0 && self.offset + self.multiple * (steps - 1.0) >= size {
            steps -= 1.0;
        }
        while self.offset + self.multiple * steps < size {
            steps += 1.0;
        }
        self.offset + self.multiple * steps
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxLayout {
    axis: Axis,
    spacing: f32,
    padding: f32,
    alignment: Alignment,
    fill_width: bool,
    fill_height: bool,
    scale_to_fit: bool,
    max_width: Option<f32>,
    max_height: Option<f32>,
    width_quantization: Option<Quantization>,
    height_quantization: Option<Quantization>,
}

impl Default for BoxLayout {
    fn default() -> Self {
        Self::vbox()
    }
}

impl BoxLayout {
    pub const fn new(axis: Axis) -> Self {
        Self {
            axis,
            spacing: 0.0,
            padding: 0.0,
            alignment: Alignment::Start,
            fill_width: false,
            fill_height: false,
            scale_to_fit: false,
            max_width: None,
            max_height: None,
            width_quantization: None,
            height_quantization: None,
        }
    }

    /// Children stacked top to bottom.
    pub const fn vbox() -> Self {
        Self::new(Axis::Vertical)
    }

    /// Children laid out left to right.
    pub const fn hbox() -> Self {
        Self::new(Axis::Horizontal)
    }

    pub const fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub const fn padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    pub const fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub const fn fill(mut self, width: bool, height: bool) -> Self {
        self.fill_width = width;
        self.fill_height = height;
        self
    }

    pub const fn scale_to_fit(mut self, enabled: bool) -> Self {
        self.scale_to_fit = enabled;
        self
    }

    /// Only consulted while scale-to-fit is on.
    pub const fn max_width(mut self, max_width: f32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub const fn max_height(mut self, max_height: f32) -> Self {
        self.max_height = Some(max_height);
        self
    }

    pub fn align_width_to_multiple(mut self, multiple: f32, offset: f32) -> Result<Self, UiError> {
        self.width_quantization = Quantization::new(Axis::Horizontal, multiple, offset)?;
        Ok(self)
    }

    pub fn align_height_to_multiple(mut self, multiple: f32, offset: f32) -> Result<Self, UiError> {
        self.height_quantization = Quantization::new(Axis::Vertical, multiple, offset)?;
        Ok(self)
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn spacing_value(&self) -> f32 {
        self.spacing
    }

    pub fn padding_value(&self) -> f32 {
        self.padding
    }

    pub fn alignment_value(&self) -> Alignment {
        self.alignment
    }

    pub fn fills_width(&self) -> bool {
        self.fill_width
    }

    pub fn fills_height(&self) -> bool {
        self.fill_height
    }

    pub fn fills_any(&self) -> bool {
        self.fill_width || self.fill_height
    }

    pub fn is_scale_to_fit(&self) -> bool {
        self.scale_to_fit
    }

    pub fn max_size(&self) -> (Option<f32>, Option<f32>) {
        (self.max_width, self.max_height)
    }

    pub fn width_quantization(&self) -> Option<Quantization> {
        self.width_quantization
    }

    pub fn height_quantization(&self) -> Option<Quantization> {
        self.height_quantization
    }

    fn quantize(&self, size: Vec2) -> Vec2 {
        Vec2::new(
            self.width_quantization.map_or(size.x, |q| q.apply(size.x)),
            self.height_quantization.map_or(size.y, |q| q.apply(size.y)),
        )
    }

    /// Uniform shrink factor that fits `content` into the available budget.
    fn fit_factor(&self, content: Vec2, resolved: Vec2) -> f32 {
        let pad = self.padding * 2.0;
        let available = Vec2::new(
            self.max_width.unwrap_or(resolved.x) - pad,
            self.max_height.unwrap_or(resolved.y) - pad,
        );
        let ratio = |available: f32, content: f32| {
            if content <= 0.0 {
                1.0
            } else {
                available.max(0.0) / content
            }
        };
        let factor = ratio(available.x, content.x).min(ratio(available.y, content.y));
        if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct LayoutCache {
    pub(crate) bounds: Option<Rect>,
    /// Slot of each visible child in the container's local space.
    pub(crate) child_bounds: FxHashMap<NodeId, Rect>,
}

impl LayoutCache {
    pub(crate) fn clear(&mut self) {
        self.bounds = None;
        self.child_bounds.clear();
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ContainerState {
    pub(crate) layout: BoxLayout,
    pub(crate) children: Vec<NodeId>,
    pub(crate) cache: LayoutCache,
    pub(crate) animate_next_layout: bool,
}

impl ContainerState {
    pub(crate) fn new(layout: BoxLayout) -> Self {
        Self {
            layout,
            children: Vec::new(),
            cache: LayoutCache::default(),
            animate_next_layout: false,
        }
    }
}

struct Measured {
    id: NodeId,
    natural: Vec2,
    scale: f32,
}

/// Sum along `axis` and max across it.
fn extent(sizes: impl Iterator<Item = Vec2>, axis: Axis) -> (f32, f32) {
    sizes.fold((0.0, 0.0), |(main, cross), size| {
        (main + axis.of(size), cross.max(axis.cross().of(size)))
    })
}

impl SceneTree {
    pub fn layout(&self, id: NodeId) -> Option<&BoxLayout> {
        self.nodes
            .get(id)
            .and_then(|node| node.container.as_ref())
            .map(|container| &container.layout)
    }

    /// Last computed size of the container, in its parent's space.
    pub fn layout_bounds(&self, id: NodeId) -> Option<Rect> {
        self.nodes
            .get(id)
            .and_then(|node| node.container.as_ref())
            .and_then(|container| container.cache.bounds)
    }

    /// Slot assigned to `child` by the last layout pass, in the container's
    /// local space.
    pub fn child_layout_bounds(&self, id: NodeId, child: NodeId) -> Option<Rect> {
        self.nodes
            .get(id)
            .and_then(|node| node.container.as_ref())
            .and_then(|container| container.cache.child_bounds.get(&child).copied())
    }

    fn configure(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut BoxLayout),
    ) -> Result<BoxLayout, UiError> {
        let node = self.nodes.get_mut(id).ok_or(UiError::UnknownNode(id))?;
        let container = node.container.as_mut().ok_or(UiError::NotAContainer(id))?;
        let previous = container.layout;
        f(&mut container.layout);
        if container.layout != previous {
            if container.layout.alignment != previous.alignment {
                container.animate_next_layout = true;
            }
            self.mark_dirty(id, DirtyFlags::LAYOUT);
        }
        Ok(previous)
    }

    pub fn set_layout(&mut self, id: NodeId, layout: BoxLayout) -> Result<(), UiError> {
        let previous = self.configure(id, |current| *current = layout)?;
        if previous.scale_to_fit && !layout.scale_to_fit {
            self.reset_child_scales(id);
        }
        Ok(())
    }

    pub fn set_spacing(&mut self, id: NodeId, spacing: f32) -> Result<(), UiError> {
        self.configure(id, |layout| layout.spacing = spacing).map(drop)
    }

    pub fn set_padding(&mut self, id: NodeId, padding: f32) -> Result<(), UiError> {
        self.configure(id, |layout| layout.padding = padding).map(drop)
    }

    /// Children ease into their new slots.
    pub fn set_alignment(&mut self, id: NodeId, alignment: Alignment) -> Result<(), UiError> {
        self.configure(id, |layout| layout.alignment = alignment).map(drop)
    }

    pub fn set_fill(&mut self, id: NodeId, width: bool, height: bool) -> Result<(), UiError> {
        self.configure(id, |layout| {
            layout.fill_width = width;
            layout.fill_height = height;
        })
        .map(drop)
    }

    /// Turning scale-to-fit off lets children grow back to scale 1.
    pub fn set_scale_to_fit(&mut self, id: NodeId, enabled: bool) -> Result<(), UiError> {
        let previous = self.configure(id, |layout| layout.scale_to_fit = enabled)?;
        if previous.scale_to_fit && !enabled {
            self.reset_child_scales(id);
        }
        Ok(())
    }

    pub fn set_max_size(
        &mut self,
        id: NodeId,
        max_width: Option<f32>,
        max_height: Option<f32>,
    ) -> Result<(), UiError> {
        self.configure(id, |layout| {
            layout.max_width = max_width;
            layout.max_height = max_height;
        })
        .map(drop)
    }

    /// Quantizes the container width; also applied to the current width
    /// right away. `multiple == 0` clears it.
    pub fn align_width_to_multiple(
        &mut self,
        id: NodeId,
        multiple: f32,
        offset: f32,
    ) -> Result<(), UiError> {
        let quantization = Quantization::new(Axis::Horizontal, multiple, offset)?;
        self.configure(id, |layout| layout.width_quantization = quantization)?;
        if let Some(q) = quantization {
            self.with_node(id, |node| {
                let size = node.size();
                node.set_size(Vec2::new(q.apply(size.x), size.y));
            });
        }
        Ok(())
    }

    pub fn align_height_to_multiple(
        &mut self,
        id: NodeId,
        multiple: f32,
        offset: f32,
    ) -> Result<(), UiError> {
        let quantization = Quantization::new(Axis::Vertical, multiple, offset)?;
        self.configure(id, |layout| layout.height_quantization = quantization)?;
        if let Some(q) = quantization {
            self.with_node(id, |node| {
                let size = node.size();
                node.set_size(Vec2::new(size.x, q.apply(size.y)));
            });
        }
        Ok(())
    }

    fn reset_child_scales(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.with_node(child, |node| node.scale_to(1.0));
        }
    }

    /// Size a fill axis stretches to: the parent's content box, or the
    /// screen size for a parentless container.
    fn fill_reference(&self, id: NodeId) -> Vec2 {
        let Some(parent) = self.parent(id) else {
            return self.screen_size;
        };
        let Some(parent_node) = self.nodes.get(parent) else {
            return self.screen_size;
        };
        let padding = parent_node
            .container
            .as_ref()
            .map_or(0.0, |container| container.layout.padding);
        (parent_node.state.size - Vec2::splat(padding * 2.0)).max(Vec2::ZERO)
    }

    /// Runs the two-pass box layout on `id` and every container below it.
    /// No-op for leaves.
    pub fn perform_layout(&mut self, id: NodeId) {
        let Some(container) = self.nodes.get(id).and_then(|node| node.container.as_ref()) else {
            return;
        };
        let layout = container.layout;
        let animate = container.animate_next_layout;
        let children = container.children.clone();
        let _span = tracing::trace_span!("layout", ?id, children = children.len()).entered();

        // Nested containers first so their reported sizes are current.
        for &child in &children {
            if self.is_container(child) {
                self.perform_layout(child);
            }
        }

        let measured: Vec<Measured> = children
            .iter()
            .filter_map(|&child| {
                let state = self.node(child)?;
                state.is_visible().then(|| Measured {
                    id: child,
                    natural: state.size() * state.layout_effect_scale(),
                    scale: state.scale(),
                })
            })
            .collect();

        let padding = layout.padding;
        if measured.is_empty() {
            self.finish_layout(id, Vec2::splat(padding * 2.0), FxHashMap::default());
            return;
        }

        let axis = layout.axis;
        let gaps = (measured.len() - 1) as f32;
        let fill_reference = self.fill_reference(id);
        let resolve = |content: Vec2| {
            Vec2::new(
                if layout.fill_width {
                    fill_reference.x
                } else {
                    content.x + padding * 2.0
                },
                if layout.fill_height {
                    fill_reference.y
                } else {
                    content.y + padding * 2.0
                },
            )
        };

        // Pass 1: natural content size, ignoring per-child scale.
        let (main, cross) = extent(measured.iter().map(|m| m.natural), axis);
        let natural = axis.pack(main + layout.spacing * gaps, cross);

        let factor = if layout.scale_to_fit {
            let factor = layout.fit_factor(natural, resolve(natural));
            for m in &measured {
                self.with_node(m.id, |node| node.scale_to(factor));
            }
            factor
        } else {
            1.0
        };

        // Pass 2: effective size with the scale each child will settle at
        // (or is currently animating through).
        let spacing = layout.spacing * factor;
        let sizes: Vec<Vec2> = measured
            .iter()
            .map(|m| {
                let scale = if layout.scale_to_fit { factor } else { m.scale };
                m.natural * scale
            })
            .collect();
        let (main, cross) = extent(sizes.iter().copied(), axis);
        let size = layout.quantize(resolve(axis.pack(main + spacing * gaps, cross)));

        let inner_cross = axis.cross().of(size) - padding * 2.0;
        let mut cursor = padding;
        let mut child_bounds = FxHashMap::default();
        for (m, &child_size) in measured.iter().zip(&sizes) {
            let slack = inner_cross - axis.cross().of(child_size);
            let offset = match layout.alignment {
                Alignment::Start => 0.0,
                Alignment::Center => slack * 0.5,
                Alignment::End => slack,
            };
            let position = axis.pack(cursor, padding + offset);
            self.with_node(m.id, |node| {
                if animate || node.is_position_animating() {
                    node.move_to(position);
                } else {
                    node.set_position(position);
                }
            });
            child_bounds.insert(m.id, Rect::from_origin_size(position, child_size));
            cursor += axis.of(child_size) + spacing;
        }

        self.finish_layout(id, size, child_bounds);
    }

    fn finish_layout(&mut self, id: NodeId, size: Vec2, child_bounds: FxHashMap<NodeId, Rect>) {
        self.with_node(id, |node| node.set_size(size));
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.state.dirty.remove(DirtyFlags::LAYOUT);
        let position = node.state.position;
        if let Some(container) = node.container.as_mut() {
            container.cache.bounds = Some(Rect::from_origin_size(position, size));
            container.cache.child_bounds = child_bounds;
            container.animate_next_layout = false;
        }
    }
}
