use glam::Vec2;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use super::layout::{BoxLayout, ContainerState};
use super::{DirtyFlags, NodeState, Panel, Rect, Widget};
use crate::effect::{Effect, EffectId};
use crate::error::UiError;
use crate::transition::{Animation, AnimationId};

slotmap::new_key_type! {
    pub struct NodeId;
}

pub(crate) struct Node {
    pub(crate) state: NodeState,
    pub(crate) widget: Box<dyn Widget>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) container: Option<ContainerState>,
}

/// Arena owning every scene node.
///
/// Parent and child links are [`NodeId`]s into the arena. A node has at most
/// one parent; attaching it elsewhere unlinks it from the old one first.
pub struct SceneTree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) screen_size: Vec2,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            screen_size: Vec2::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn create_element(&mut self, widget: impl Widget) -> NodeId {
        self.insert_node(Box::new(widget), None)
    }

    pub fn create_container(&mut self, widget: impl Widget, layout: BoxLayout) -> NodeId {
        self.insert_node(Box::new(widget), Some(ContainerState::new(layout)))
    }

    /// A container that draws nothing itself.
    pub fn create_box(&mut self, layout: BoxLayout) -> NodeId {
        self.create_container(Panel, layout)
    }

    fn insert_node(&mut self, widget: Box<dyn Widget>, container: Option<ContainerState>) -> NodeId {
        let mut state = NodeState::default();
        let mut initial = DirtyFlags::POSITION
            | DirtyFlags::SIZE
            | DirtyFlags::VISIBILITY
            | DirtyFlags::CONTENT;
        if container.is_some() {
            initial |= DirtyFlags::LAYOUT;
        }
        state.mark_dirty(initial);
        self.nodes.insert(Node {
            state,
            widget,
            parent: None,
            container,
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(id).map(|node| &node.state)
    }

    pub fn widget<W: Widget>(&self, id: NodeId) -> Option<&W> {
        self.nodes
            .get(id)
            .and_then(|node| node.widget.as_any().downcast_ref::<W>())
    }

    pub fn is_container(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|node| node.container.is_some())
    }

    pub fn debug_name(&self, id: NodeId) -> Option<&str> {
        let node = self.nodes.get(id)?;
        Some(
            node.state
                .debug_name()
                .unwrap_or_else(|| node.widget.default_debug_name()),
        )
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Children in layout order; empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .and_then(|node| node.container.as_ref())
            .map_or(&[], |container| container.children.as_slice())
    }

    pub fn screen_size(&self) -> Vec2 {
        self.screen_size
    }

    /// Size used by parentless fill containers.
    pub fn set_screen_size(&mut self, size: Vec2) {
        if self.screen_size == size {
            return;
        }
        self.screen_size = size;
        let roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.parent.is_none()
                    && node
                        .container
                        .as_ref()
                        .is_some_and(|container| container.layout.fills_any())
            })
            .map(|(id, _)| id)
            .collect();
        for id in roots {
            self.mark_dirty(id, DirtyFlags::LAYOUT);
        }
    }

    // ---- dirty propagation -------------------------------------------------

    pub fn mark_dirty(&mut self, id: NodeId, flags: DirtyFlags) {
        let Some(node) = self.nodes.get_mut(id) else {
            tracing::warn!(?id, "mark_dirty on unknown node");
            return;
        };
        let before = node.state.dirty;
        node.state.mark_dirty(flags);
        if flags.intersects(DirtyFlags::GEOMETRY) {
            self.invalidate_bounds(id);
        }
        self.sync_dirty(id, before);
    }

    /// Reacts to flags that appeared on `id` since `before`: geometry
    /// changes drop cached bounds below `id`, and any new flag is reported
    /// to the parent once.
    pub(crate) fn sync_dirty(&mut self, id: NodeId, before: DirtyFlags) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let added = node.state.dirty.difference(before);
        if added.is_empty() {
            return;
        }
        let parent = node.parent;
        if added.intersects(DirtyFlags::GEOMETRY) {
            self.invalidate_bounds(id);
        }
        if added.intersects(DirtyFlags::SIZE | DirtyFlags::LAYOUT) {
            self.clear_layout_cache(id);
        }
        if added.contains(DirtyFlags::SIZE) {
            self.relayout_fill_children(id);
        }
        if let Some(parent) = parent {
            self.on_child_dirty(parent, added);
        }
    }

    fn on_child_dirty(&mut self, parent: NodeId, child_flags: DirtyFlags) {
        let mut flags = DirtyFlags::CHILDREN;
        if child_flags.intersects(DirtyFlags::SIZE | DirtyFlags::VISIBILITY) {
            flags |= DirtyFlags::LAYOUT;
        }
        let Some(node) = self.nodes.get_mut(parent) else {
            return;
        };
        let before = node.state.dirty;
        node.state.mark_dirty(flags);
        self.sync_dirty(parent, before);
    }

    /// Drops cached bounds on `id` and every descendant.
    pub(crate) fn invalidate_bounds(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.state.bounds_cache.set(None);
            if let Some(container) = node.container.as_ref() {
                stack.extend(container.children.iter().copied());
            }
        }
    }

    /// Fill containers track their parent's size, so they re-run layout
    /// whenever it changes.
    fn relayout_fill_children(&mut self, id: NodeId) {
        let fill_children: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|&child| self.layout(child).is_some_and(|layout| layout.fills_any()))
            .collect();
        for child in fill_children {
            self.mark_dirty(child, DirtyFlags::LAYOUT);
        }
    }

    pub(crate) fn clear_layout_cache(&mut self, id: NodeId) {
        if let Some(container) = self.nodes.get_mut(id).and_then(|n| n.container.as_mut()) {
            container.cache.clear();
        }
    }

    /// True while anything about `id` or its subtree is still changing.
    pub fn needs_update(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        node.state.has_pending_work()
            || node
                .container
                .as_ref()
                .is_some_and(|c| c.children.iter().any(|&child| self.needs_update(child)))
    }

    /// Collects every node under `id` whose subtree has pending work, in one
    /// post-order walk.
    fn collect_active(&self, id: NodeId, active: &mut FxHashSet<NodeId>) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let mut pending = node.state.has_pending_work();
        if let Some(container) = node.container.as_ref() {
            for &child in &container.children {
                pending |= self.collect_active(child, active);
            }
        }
        if pending {
            active.insert(id);
        }
        pending
    }

    // ---- mutation ----------------------------------------------------------

    /// Mutates the node's state and propagates whatever flags it raised.
    pub fn with_node<R>(&mut self, id: NodeId, f: impl FnOnce(&mut NodeState) -> R) -> Option<R> {
        let node = self.nodes.get_mut(id)?;
        let before = node.state.dirty;
        let result = f(&mut node.state);
        self.sync_dirty(id, before);
        Some(result)
    }

    /// Like [`with_node`](Self::with_node) with the concrete widget as well.
    /// Returns `None` when the node is missing or holds another widget type.
    pub fn with_widget<W: Widget, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut W, &mut NodeState) -> R,
    ) -> Option<R> {
        let node = self.nodes.get_mut(id)?;
        let before = node.state.dirty;
        let Node { state, widget, .. } = node;
        let widget = widget.as_any_mut().downcast_mut::<W>()?;
        let result = f(widget, state);
        self.sync_dirty(id, before);
        Some(result)
    }

    pub(crate) fn call_widget<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Widget, &mut NodeState) -> R,
    ) -> Option<R> {
        let node = self.nodes.get_mut(id)?;
        let before = node.state.dirty;
        let Node { state, widget, .. } = node;
        let result = f(widget.as_mut(), state);
        self.sync_dirty(id, before);
        Some(result)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec2) {
        self.with_node(id, |node| node.set_position(position));
    }

    pub fn move_to(&mut self, id: NodeId, position: Vec2) {
        self.with_node(id, |node| node.move_to(position));
    }

    pub fn set_size(&mut self, id: NodeId, size: Vec2) {
        self.with_node(id, |node| node.set_size(size));
    }

    pub fn set_scale(&mut self, id: NodeId, scale: f32) {
        self.with_node(id, |node| node.set_scale(scale));
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.with_node(id, |node| node.set_visible(visible));
    }

    pub fn add_effect(&mut self, id: NodeId, effect: Effect) -> Option<EffectId> {
        self.with_node(id, |node| node.add_effect(effect))
    }

    pub fn add_exclusive_effect(&mut self, id: NodeId, effect: Effect) -> Option<EffectId> {
        self.with_node(id, |node| node.add_exclusive_effect(effect))
    }

    pub fn add_animation(&mut self, id: NodeId, animation: Animation) -> Option<AnimationId> {
        self.with_node(id, |node| node.add_animation(animation))
    }

    pub fn add_exclusive_animation(
        &mut self,
        id: NodeId,
        animation: Animation,
    ) -> Option<AnimationId> {
        self.with_node(id, |node| node.add_exclusive_animation(animation))
    }

    // ---- structure ---------------------------------------------------------

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), UiError> {
        let len = self
            .children(parent)
            .iter()
            .filter(|&&id| id != child)
            .count();
        self.insert_child(parent, len, child)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), UiError> {
        self.check_attach(parent, child)?;
        let siblings = self.children(parent);
        let len = siblings.len() - usize::from(siblings.contains(&child));
        if index > len {
            return Err(UiError::IndexOutOfRange { index, len });
        }
        self.unlink(child);
        let Some(container) = self.nodes.get_mut(parent).and_then(|n| n.container.as_mut()) else {
            return Err(UiError::NotAContainer(parent));
        };
        container.children.insert(index, child);
        container.cache.clear();
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.invalidate_bounds(child);
        self.mark_dirty(parent, DirtyFlags::CHILDREN | DirtyFlags::LAYOUT);
        Ok(())
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(), UiError> {
        if parent == child {
            return Err(UiError::SelfParent(child));
        }
        let parent_node = self.nodes.get(parent).ok_or(UiError::UnknownNode(parent))?;
        if !self.nodes.contains_key(child) {
            return Err(UiError::UnknownNode(child));
        }
        if parent_node.container.is_none() {
            return Err(UiError::NotAContainer(parent));
        }
        let mut cursor = parent_node.parent;
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(UiError::WouldCycle { parent, child });
            }
            cursor = self.nodes.get(ancestor).and_then(|node| node.parent);
        }
        Ok(())
    }

    /// Attaches `child` under `parent`, or detaches it with `None`.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), UiError> {
        match parent {
            Some(parent) => self.add_child(parent, child),
            None => self.detach(child),
        }
    }

    /// Unlinks `child` from its parent and keeps it alive as a root.
    pub fn detach(&mut self, child: NodeId) -> Result<(), UiError> {
        if !self.nodes.contains_key(child) {
            return Err(UiError::UnknownNode(child));
        }
        self.unlink(child);
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(container) = self
            .nodes
            .get_mut(parent)
            .and_then(|node| node.container.as_mut())
        {
            container.children.retain(|&id| id != child);
            container.cache.clear();
        }
        self.invalidate_bounds(child);
        self.mark_dirty(parent, DirtyFlags::CHILDREN | DirtyFlags::LAYOUT);
    }

    /// Detaches `child` from `parent` and destroys it with its subtree.
    /// Effects and animations on the removed nodes go with them.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), UiError> {
        if !self.nodes.contains_key(parent) {
            return Err(UiError::UnknownNode(parent));
        }
        match self.nodes.get(child) {
            None => Err(UiError::UnknownNode(child)),
            Some(node) if node.parent != Some(parent) => Err(UiError::NotAChild { parent, child }),
            Some(_) => {
                self.remove(child);
                Ok(())
            }
        }
    }

    /// Destroys `id` and its subtree, unlinking it from any parent first.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        self.unlink(id);
        let mut stack = vec![id];
        let mut removed = 0usize;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                removed += 1;
                if let Some(container) = node.container {
                    stack.extend(container.children);
                }
            }
        }
        tracing::debug!(?id, removed, "removed subtree");
        true
    }

    /// Moves the child at `from` to `to`; the re-flow animates.
    pub fn move_child(&mut self, parent: NodeId, from: usize, to: usize) -> Result<(), UiError> {
        let node = self.nodes.get_mut(parent).ok_or(UiError::UnknownNode(parent))?;
        let container = node.container.as_mut().ok_or(UiError::NotAContainer(parent))?;
        let len = container.children.len();
        if from >= len {
            return Err(UiError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(UiError::IndexOutOfRange { index: to, len });
        }
        if from == to {
            return Ok(());
        }
        let child = container.children.remove(from);
        container.children.insert(to, child);
        container.animate_next_layout = true;
        container.cache.clear();
        self.mark_dirty(parent, DirtyFlags::CHILDREN | DirtyFlags::LAYOUT);
        Ok(())
    }

    // ---- update ------------------------------------------------------------

    /// Advances `id` and its subtree by `dt` seconds.
    ///
    /// A node with nothing pending is skipped without side effects. Bad `dt`
    /// values are treated as zero so one broken frame can't poison state.
    pub fn update(&mut self, id: NodeId, dt: f32) {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            tracing::warn!(dt, "non-finite or negative frame delta, using 0");
            0.0
        };
        let mut active = FxHashSet::default();
        if self.collect_active(id, &mut active) {
            self.update_node(id, dt, &active);
        }
    }

    /// `active` is the set computed before the tick. Work raised during the
    /// tick still reaches a node through its own flags: a clean ancestor that
    /// has not been visited yet picks up CHILDREN from the propagation.
    fn update_node(&mut self, id: NodeId, dt: f32, active: &FxHashSet<NodeId>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if !active.contains(&id) && !node.state.has_pending_work() {
            return;
        }
        let _span = tracing::trace_span!("update", ?id).entered();

        let before = node.state.dirty;
        node.state.step_smoothing(dt);
        node.state.step_animations(dt);
        node.state.step_effects(dt);
        self.sync_dirty(id, before);

        let triggered = match self.nodes.get_mut(id) {
            Some(node) => std::mem::take(&mut node.state.dirty),
            None => return,
        };
        if triggered.contains(DirtyFlags::POSITION) {
            self.call_widget(id, |widget, node| widget.on_position_changed(node));
        }
        if triggered.contains(DirtyFlags::SIZE) {
            self.call_widget(id, |widget, node| widget.on_size_changed(node));
        }
        if triggered.contains(DirtyFlags::LAYOUT) {
            self.perform_layout(id);
        }
        if triggered.contains(DirtyFlags::VISIBILITY) {
            self.call_widget(id, |widget, node| widget.on_visibility_changed(node));
        }

        self.call_widget(id, |widget, node| widget.on_update(node, dt));

        let children = self.children(id).to_vec();
        for child in children {
            self.update_node(child, dt, active);
        }

        // Children that resized while stepping are measured again this tick,
        // so the parent never reports a stale size.
        if self
            .nodes
            .get(id)
            .is_some_and(|node| node.state.dirty.contains(DirtyFlags::LAYOUT))
        {
            self.perform_layout(id);
        }

        let after = self.nodes.get(id).map_or(DirtyFlags::empty(), |n| n.state.dirty);
        if (triggered | after).intersects(DirtyFlags::GEOMETRY) {
            self.invalidate_bounds(id);
        }
    }

    // ---- geometry ----------------------------------------------------------

    /// Global origin and accumulated scale of `id`'s local space.
    pub(crate) fn global_transform(&self, id: NodeId) -> Option<(Vec2, f32)> {
        let node = self.nodes.get(id)?;
        let mut local = node.state.position;
        if node.state.effects_affect_layout {
            local += node.state.combined_effect.position_offset;
        }
        let own_scale = node.state.scale * node.state.layout_effect_scale();
        match node.parent {
            Some(parent) => {
                let (origin, scale) = self.global_transform(parent)?;
                Some((origin + local * scale, scale * own_scale))
            }
            None => Some((local, own_scale)),
        }
    }

    fn geometry_pending(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get(current) else {
                return true;
            };
            if node.state.dirty.intersects(DirtyFlags::GEOMETRY) {
                return true;
            }
            cursor = node.parent;
        }
        false
    }

    /// Screen-space bounds of `id`.
    ///
    /// Cached per node; the cache is only read or written while no geometry
    /// flag is pending on the node or any ancestor.
    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        let node = self.nodes.get(id)?;
        let clean = !self.geometry_pending(id);
        if clean && let Some(cached) = node.state.bounds_cache.get() {
            return Some(cached);
        }
        let (origin, scale) = self.global_transform(id)?;
        let bounds = Rect::from_origin_size(origin, node.state.size * scale);
        if clean {
            node.state.bounds_cache.set(Some(bounds));
        }
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::TransformDelta;

    fn settle(tree: &mut SceneTree, root: NodeId) {
        for _ in 0..600 {
            if !tree.needs_update(root) {
                return;
            }
            tree.update(root, 1.0 / 60.0);
        }
        panic!("tree did not settle");
    }

    fn leaf(tree: &mut SceneTree, size: Vec2) -> NodeId {
        let id = tree.create_element(Panel);
        tree.set_size(id, size);
        id
    }

    #[test]
    fn child_dirt_reaches_every_ancestor() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox());
        let middle = tree.create_box(BoxLayout::vbox());
        let child = leaf(&mut tree, Vec2::new(10.0, 10.0));
        tree.add_child(root, middle).unwrap();
        tree.add_child(middle, child).unwrap();
        settle(&mut tree, root);
        assert!(tree.node(root).unwrap().dirty_flags().is_empty());

        tree.set_size(child, Vec2::new(20.0, 10.0));
        let middle_flags = tree.node(middle).unwrap().dirty_flags();
        assert!(middle_flags.contains(DirtyFlags::CHILDREN | DirtyFlags::LAYOUT));
        assert!(tree.node(root).unwrap().dirty_flags().contains(DirtyFlags::CHILDREN));
        assert!(tree.needs_update(root));
    }

    #[test]
    fn non_size_child_change_does_not_relayout_parent() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox());
        let child = leaf(&mut tree, Vec2::new(10.0, 10.0));
        tree.add_child(root, child).unwrap();
        settle(&mut tree, root);

        tree.mark_dirty(child, DirtyFlags::CONTENT);
        assert_eq!(tree.node(root).unwrap().dirty_flags(), DirtyFlags::CHILDREN);
    }

    #[test]
    fn tree_settles_after_mutations() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::hbox().spacing(4.0).padding(2.0));
        let children: Vec<_> = (0..3)
            .map(|i| leaf(&mut tree, Vec2::new(10.0 + i as f32, 8.0)))
            .collect();
        for &child in &children {
            tree.add_child(root, child).unwrap();
        }
        settle(&mut tree, root);

        tree.set_size(children[1], Vec2::new(30.0, 30.0));
        tree.move_child(root, 0, 2).unwrap();
        tree.with_node(children[2], |node| node.pulse_effect_scale(1.2));
        settle(&mut tree, root);
        assert!(!tree.needs_update(root));
    }

    #[test]
    fn infinite_effect_keeps_node_ticking() {
        let mut tree = SceneTree::new();
        let id = leaf(&mut tree, Vec2::new(4.0, 4.0));
        tree.add_effect(id, Effect::breathe(0.1, 1.0));
        for _ in 0..120 {
            tree.update(id, 1.0 / 60.0);
        }
        assert!(tree.needs_update(id));
    }

    #[test]
    fn click_bounce_leaves_no_effects_and_unit_scale() {
        let mut tree = SceneTree::new();
        let id = leaf(&mut tree, Vec2::new(20.0, 20.0));
        tree.add_exclusive_effect(id, Effect::click_bounce());
        let mut elapsed = 0.0;
        while elapsed < crate::effect::CLICK_BOUNCE_DURATION + 0.02 {
            tree.update(id, 0.02);
            elapsed += 0.02;
        }
        let node = tree.node(id).unwrap();
        assert!(node.effects().is_empty());
        assert_eq!(node.render_scale(), 1.0);
        assert!(!tree.needs_update(id));
    }

    #[test]
    fn parent_measures_child_resized_in_the_same_tick() {
        use crate::transition::Keyframe;

        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox());
        let child = leaf(&mut tree, Vec2::new(10.0, 10.0));
        tree.add_child(root, child).unwrap();
        settle(&mut tree, root);
        assert_eq!(tree.node(root).unwrap().size(), Vec2::new(10.0, 10.0));

        tree.add_animation(
            child,
            Animation::on_node([Keyframe::new(0.0, 50.0)], |node, value| {
                node.set_size(Vec2::splat(value))
            }),
        );
        tree.update(root, 1.0 / 60.0);
        assert_eq!(tree.node(child).unwrap().size(), Vec2::splat(50.0));
        assert_eq!(tree.node(root).unwrap().size(), Vec2::splat(50.0));
        assert_eq!(tree.layout_bounds(root).map(|b| b.size()), Some(Vec2::splat(50.0)));
    }

    #[test]
    fn nested_parents_all_catch_up_in_one_tick() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox().padding(1.0));
        let middle = tree.create_box(BoxLayout::hbox().padding(2.0));
        let child = leaf(&mut tree, Vec2::new(10.0, 10.0));
        tree.add_child(root, middle).unwrap();
        tree.add_child(middle, child).unwrap();
        settle(&mut tree, root);

        tree.with_node(child, |node| {
            node.set_effects_affect_layout(true);
            node.add_effect(Effect::constant(TransformDelta::scaled(2.0)));
        });
        tree.update(root, 1.0 / 60.0);
        assert_eq!(tree.node(middle).unwrap().size(), Vec2::new(24.0, 24.0));
        assert_eq!(tree.node(root).unwrap().size(), Vec2::new(26.0, 26.0));
    }

    #[test]
    fn clean_subtrees_are_not_visited() {
        use std::cell::Cell;
        use std::rc::Rc;

        use crate::view::{EventHandler, Renderable, Updatable};

        struct Counter(Rc<Cell<u32>>);
        impl Updatable for Counter {
            fn on_update(&mut self, _node: &mut NodeState, _dt: f32) {
                self.0.set(self.0.get() + 1);
            }
        }
        impl Renderable for Counter {}
        impl EventHandler for Counter {}
        impl Widget for Counter {
            fn default_debug_name(&self) -> &'static str {
                "Counter"
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::hbox());
        let mut parent = root;
        for _ in 0..300 {
            let next = tree.create_box(BoxLayout::vbox());
            tree.add_child(parent, next).unwrap();
            parent = next;
        }
        let calls = Rc::new(Cell::new(0));
        let quiet = tree.create_element(Counter(calls.clone()));
        tree.set_size(quiet, Vec2::ONE);
        tree.add_child(root, quiet).unwrap();
        let busy = leaf(&mut tree, Vec2::ONE);
        tree.add_child(parent, busy).unwrap();
        settle(&mut tree, root);

        let settled_calls = calls.get();
        tree.add_effect(busy, Effect::breathe(0.1, 1.0));
        for _ in 0..10 {
            tree.update(root, 1.0 / 60.0);
        }
        assert_eq!(calls.get(), settled_calls);
        assert!(tree.needs_update(root));
    }

    #[test]
    fn bounds_follow_parent_transform() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox().padding(5.0));
        let child = leaf(&mut tree, Vec2::new(10.0, 10.0));
        tree.add_child(root, child).unwrap();
        tree.set_position(root, Vec2::new(100.0, 50.0));
        settle(&mut tree, root);
        assert_eq!(tree.bounds(child), Some(Rect::new(105.0, 55.0, 10.0, 10.0)));

        tree.set_position(root, Vec2::new(0.0, 0.0));
        assert_eq!(tree.bounds(child), Some(Rect::new(5.0, 5.0, 10.0, 10.0)));

        tree.set_scale(root, 2.0);
        assert_eq!(tree.bounds(child), Some(Rect::new(10.0, 10.0, 20.0, 20.0)));
    }

    #[test]
    fn cached_bounds_match_fresh_computation() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox().spacing(3.0));
        let a = leaf(&mut tree, Vec2::new(10.0, 10.0));
        let b = leaf(&mut tree, Vec2::new(12.0, 6.0));
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        settle(&mut tree, root);
        let cached = tree.bounds(b).unwrap();
        tree.invalidate_bounds(root);
        assert_eq!(tree.bounds(b).unwrap(), cached);

        tree.set_size(a, Vec2::new(10.0, 40.0));
        settle(&mut tree, root);
        let after = tree.bounds(b).unwrap();
        tree.invalidate_bounds(root);
        assert_eq!(tree.bounds(b).unwrap(), after);
        assert_eq!(after.y, 43.0);
    }

    #[test]
    fn effect_offset_moves_bounds_only_when_it_affects_layout() {
        let mut tree = SceneTree::new();
        let id = leaf(&mut tree, Vec2::new(10.0, 10.0));
        tree.add_effect(id, Effect::constant(TransformDelta::offset(Vec2::new(3.0, 0.0))));
        tree.update(id, 0.016);
        assert_eq!(tree.bounds(id).unwrap().x, 0.0);
        tree.with_node(id, |node| node.set_effects_affect_layout(true));
        assert_eq!(tree.bounds(id).unwrap().x, 3.0);
    }

    #[test]
    fn structural_errors_are_reported() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox());
        let inner = tree.create_box(BoxLayout::vbox());
        let leaf_id = leaf(&mut tree, Vec2::ONE);
        tree.add_child(root, inner).unwrap();

        assert_eq!(tree.add_child(root, root), Err(UiError::SelfParent(root)));
        assert_eq!(tree.add_child(leaf_id, root), Err(UiError::NotAContainer(leaf_id)));
        assert_eq!(
            tree.add_child(inner, root),
            Err(UiError::WouldCycle { parent: inner, child: root })
        );
        assert_eq!(
            tree.insert_child(root, 5, leaf_id),
            Err(UiError::IndexOutOfRange { index: 5, len: 1 })
        );
        assert_eq!(
            tree.remove_child(inner, leaf_id),
            Err(UiError::NotAChild { parent: inner, child: leaf_id })
        );
    }

    #[test]
    fn reparenting_clears_old_link() {
        let mut tree = SceneTree::new();
        let a = tree.create_box(BoxLayout::vbox());
        let b = tree.create_box(BoxLayout::hbox());
        let child = leaf(&mut tree, Vec2::ONE);
        tree.add_child(a, child).unwrap();
        tree.set_parent(child, Some(b)).unwrap();
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[child]);
        assert_eq!(tree.parent(child), Some(b));

        tree.detach(child).unwrap();
        assert_eq!(tree.parent(child), None);
        assert!(tree.contains(child));
    }

    #[test]
    fn remove_child_destroys_subtree() {
        let mut tree = SceneTree::new();
        let root = tree.create_box(BoxLayout::vbox());
        let inner = tree.create_box(BoxLayout::vbox());
        let grandchild = leaf(&mut tree, Vec2::ONE);
        tree.add_child(root, inner).unwrap();
        tree.add_child(inner, grandchild).unwrap();

        tree.remove_child(root, inner).unwrap();
        assert!(!tree.contains(inner));
        assert!(!tree.contains(grandchild));
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn bad_frame_delta_is_ignored() {
        let mut tree = SceneTree::new();
        let id = leaf(&mut tree, Vec2::ONE);
        tree.move_to(id, Vec2::new(10.0, 0.0));
        tree.update(id, f32::NAN);
        tree.update(id, -1.0);
        assert_eq!(tree.node(id).unwrap().position(), Vec2::ZERO);
    }

    #[test]
    fn with_widget_rejects_wrong_type() {
        use crate::view::{EventHandler, Renderable, Updatable};

        struct Other;
        impl Updatable for Other {}
        impl Renderable for Other {}
        impl EventHandler for Other {}
        impl Widget for Other {
            fn default_debug_name(&self) -> &'static str {
                "Other"
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let mut tree = SceneTree::new();
        let id = tree.create_element(Other);
        assert!(tree.with_widget::<Panel, _>(id, |_, _| ()).is_none());
        assert!(tree.with_widget::<Other, _>(id, |_, _| ()).is_some());
        assert_eq!(tree.debug_name(id), Some("Other"));
    }
}
