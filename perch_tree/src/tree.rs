// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, updates, queries.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{Affine, Point, Rect};

use crate::types::{LocalNode, NodeFlags, NodeId};

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Element tree.
pub struct Tree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

/// Results of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The matched element.
    pub node: NodeId,
    /// Path from root to element (inclusive).
    pub path: Vec<NodeId>,
}

/// Filters applied during hit testing.
///
/// Used by [`Tree::hit_test_point`].
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryFilter {
    /// If true, only consider elements that are displayed (they and all ancestors are
    /// marked [`NodeFlags::VISIBLE`]).
    pub visible_only: bool,
    /// If true, only consider elements marked [`NodeFlags::PICKABLE`].
    pub pickable_only: bool,
}

impl QueryFilter {
    /// Filter matching what a pointer can actually reach.
    pub const POINTER: Self = Self {
        visible_only: true,
        pickable_only: true,
    };
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: LocalNode,
}

impl Node {
    fn new(generation: u32, local: LocalNode) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Insert a new element as the last child of `parent` (or as a root if `None`).
    ///
    /// A stale `parent` inserts the element as a root.
    pub fn insert(&mut self, parent: Option<NodeId>, local: LocalNode) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        if let Some(p) = parent
            && self.is_alive(p)
        {
            self.link_parent(id, p);
        }
        id
    }

    /// Remove an element (and its subtree) from the tree.
    ///
    /// Removing a stale id is a no-op.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        let children = self.node(id).children.clone();
        for child in children {
            self.remove(child);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Move `id` to the end of `new_parent`'s children (or make it a root).
    ///
    /// Returns `false` and leaves the tree untouched if either id is stale or if
    /// `new_parent` lies inside the subtree of `id`.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        if let Some(p) = new_parent
            && (!self.is_alive(p) || self.contains(id, p))
        {
            return false;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
        }
        true
    }

    /// Returns true if `id` refers to a live element.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if the tree holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parent of a live element.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id)?.parent
    }

    /// Children of a live element in insertion order. Empty for stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Returns true if `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_alive(ancestor) || !self.is_alive(node) {
            return false;
        }
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.node(n).parent;
        }
        false
    }

    /// Path from root to `id` (inclusive). Empty for stale ids.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.is_alive(id) {
            return out;
        }
        let mut cur = Some(id);
        while let Some(n) = cur {
            out.push(n);
            cur = self.node(n).parent;
        }
        out.reverse();
        out
    }

    /// `root` and all of its descendants in document (pre-)order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.is_alive(root) {
            return out;
        }
        let mut stack = alloc::vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// First element in document order under `root` (inclusive) matching `pred`.
    pub fn find_first(&self, root: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(root).into_iter().find(|&id| pred(self, id))
    }

    /// First element under `root` whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, root: NodeId, name: &str, value: &str) -> Option<NodeId> {
        self.find_first(root, |t, id| t.attr(id, name) == Some(value))
    }

    // --- attributes and style ---

    /// Attribute value of a live element.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node_opt(id)?
            .local
            .attributes
            .get(name)
            .map(String::as_str)
    }

    /// Returns true if the live element carries attribute `name`.
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute on a live element.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.attributes.insert(name.into(), value.into());
        }
    }

    /// Remove an attribute from a live element.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.attributes.remove(name);
        }
    }

    /// Inline style property of a live element.
    pub fn style(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node_opt(id)?.local.style.get(name).map(String::as_str)
    }

    /// Set (or with `None`, clear) an inline style property.
    pub fn set_style(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        if let Some(n) = self.node_opt_mut(id) {
            match value {
                Some(v) => {
                    n.local.style.insert(name.into(), v.into());
                }
                None => {
                    n.local.style.remove(name);
                }
            }
        }
    }

    // --- flags and geometry ---

    /// Flags of a live element.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node_opt(id).map(|n| n.local.flags)
    }

    /// Update element flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags = flags;
        }
    }

    /// Toggle [`NodeFlags::VISIBLE`] on a live element.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags.set(NodeFlags::VISIBLE, visible);
        }
    }

    /// Returns true if the element and all of its ancestors are visible.
    pub fn is_displayed(&self, id: NodeId) -> bool {
        let path = self.path_to_root(id);
        !path.is_empty()
            && path
                .iter()
                .all(|&n| self.node(n).local.flags.contains(NodeFlags::VISIBLE))
    }

    /// Update the layout box.
    pub fn set_local_bounds(&mut self, id: NodeId, bounds: Rect) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.local_bounds = bounds;
        }
    }

    /// Layout box of a live element in parent space.
    pub fn local_bounds(&self, id: NodeId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.local.local_bounds)
    }

    /// Update the local transform.
    pub fn set_local_transform(&mut self, id: NodeId, tf: Affine) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.local_transform = tf;
        }
    }

    /// Local transform of a live element.
    pub fn local_transform(&self, id: NodeId) -> Option<Affine> {
        self.node_opt(id).map(|n| n.local.local_transform)
    }

    /// Update z index.
    pub fn set_z_index(&mut self, id: NodeId, z: i32) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.z_index = z;
        }
    }

    /// Returns the z-index of an element if the identifier is live.
    pub fn z_index(&self, id: NodeId) -> Option<i32> {
        self.node_opt(id).map(|n| n.local.z_index)
    }

    /// Composition of all transforms from the root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Option<Affine> {
        let path = self.path_to_root(id);
        if path.is_empty() {
            return None;
        }
        Some(
            path.iter()
                .fold(Affine::IDENTITY, |acc, &n| acc * self.node(n).local.local_transform),
        )
    }

    /// World-space AABB of the element's layout box.
    pub fn world_bounds(&self, id: NodeId) -> Option<Rect> {
        let tf = self.world_transform(id)?;
        Some(transform_rect_bbox(tf, self.node(id).local.local_bounds))
    }

    /// Hit test a world-space point. Returns the topmost element.
    ///
    /// Elements are ranked by their effective z (the highest `z_index` on the
    /// root→element path), then by depth (descendants above ancestors), then the
    /// newer [`NodeId`] wins.
    pub fn hit_test_point(&self, pt: Point, filter: QueryFilter) -> Option<Hit> {
        let mut best: Option<(NodeId, i32, usize)> = None;
        for (i, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot.as_ref() else {
                continue;
            };
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let id = NodeId::new(i as u32, node.generation);
            if filter.pickable_only && !node.local.flags.contains(NodeFlags::PICKABLE) {
                continue;
            }
            if filter.visible_only && !self.is_displayed(id) {
                continue;
            }
            let Some(bounds) = self.world_bounds(id) else {
                continue;
            };
            if !bounds.contains(pt) {
                continue;
            }
            let path = self.path_to_root(id);
            let z = path
                .iter()
                .map(|&n| self.node(n).local.z_index)
                .max()
                .unwrap_or(0);
            let depth = path.len();
            let better = match best {
                None => true,
                Some((best_id, z_best, depth_best)) => {
                    (z, depth) > (z_best, depth_best)
                        || ((z, depth) == (z_best, depth_best) && id.is_newer_than(best_id))
                }
            };
            if better {
                best = Some((id, z, depth));
            }
        }
        best.map(|(node, _, _)| Hit {
            node,
            path: self.path_to_root(node),
        })
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.push(id);
        }
        if let Some(n) = self.node_opt_mut(id) {
            n.parent = Some(parent);
        }
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_opt_mut(id) {
            n.parent = None;
        }
    }
}

fn transform_rect_bbox(affine: Affine, rect: Rect) -> Rect {
    let p0 = affine * Point::new(rect.x0, rect.y0);
    let p1 = affine * Point::new(rect.x1, rect.y0);
    let p2 = affine * Point::new(rect.x0, rect.y1);
    let p3 = affine * Point::new(rect.x1, rect.y1);
    let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
    let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
    let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
    let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);
    Rect::new(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    fn boxed(x0: f64, y0: f64, x1: f64, y1: f64) -> LocalNode {
        LocalNode::with_bounds(Rect::new(x0, y0, x1, y1))
    }

    #[test]
    fn insert_and_hit_test() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 200.0, 200.0));
        let _a = tree.insert(Some(root), boxed(10.0, 10.0, 60.0, 60.0));
        let mut b_local = boxed(40.0, 40.0, 120.0, 120.0);
        b_local.z_index = 10;
        let b = tree.insert(Some(root), b_local);

        let hit = tree
            .hit_test_point(Point::new(50.0, 50.0), QueryFilter::POINTER)
            .unwrap();
        assert_eq!(hit.node, b, "topmost by z should win");
        assert_eq!(hit.path.first().copied(), Some(root));
        assert_eq!(hit.path.last().copied(), Some(b));
    }

    #[test]
    fn descendants_win_over_ancestors() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 100.0, 100.0));
        let child = tree.insert(Some(root), boxed(0.0, 0.0, 50.0, 50.0));
        let hit = tree
            .hit_test_point(Point::new(10.0, 10.0), QueryFilter::POINTER)
            .unwrap();
        assert_eq!(hit.node, child);
    }

    #[test]
    fn hidden_ancestor_hides_subtree_from_hits() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 100.0, 100.0));
        let panel = tree.insert(Some(root), boxed(0.0, 0.0, 50.0, 50.0));
        let item = tree.insert(Some(panel), boxed(0.0, 0.0, 20.0, 20.0));
        tree.set_visible(panel, false);
        assert!(!tree.is_displayed(item));
        let hit = tree
            .hit_test_point(Point::new(10.0, 10.0), QueryFilter::POINTER)
            .unwrap();
        assert_eq!(hit.node, root);
    }

    #[test]
    fn non_pickable_container_passes_through() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 100.0, 100.0));
        let layer = tree.insert(
            Some(root),
            boxed(0.0, 0.0, 100.0, 100.0).flags(NodeFlags::VISIBLE),
        );
        tree.set_z_index(layer, 50);
        let hit = tree
            .hit_test_point(Point::new(10.0, 10.0), QueryFilter::POINTER)
            .unwrap();
        assert_eq!(hit.node, root);

        let inside = tree.insert(Some(layer), boxed(0.0, 0.0, 20.0, 20.0));
        let hit = tree
            .hit_test_point(Point::new(10.0, 10.0), QueryFilter::POINTER)
            .unwrap();
        assert_eq!(hit.node, inside, "children of a pass-through layer stay pickable");
    }

    #[test]
    fn transforms_compose_through_ancestors() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 500.0, 500.0));
        let group = tree.insert(Some(root), boxed(0.0, 0.0, 0.0, 0.0));
        tree.set_local_transform(group, Affine::translate(Vec2::new(100.0, 0.0)));
        let n = tree.insert(Some(group), boxed(0.0, 0.0, 10.0, 10.0));
        tree.set_local_transform(n, Affine::translate(Vec2::new(0.0, 30.0)));
        assert_eq!(
            tree.world_bounds(n),
            Some(Rect::new(100.0, 30.0, 110.0, 40.0))
        );
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 1.0, 1.0));
        let a = tree.insert(Some(root), boxed(0.0, 0.0, 1.0, 1.0));
        let a_child = tree.insert(Some(a), boxed(0.0, 0.0, 1.0, 1.0));

        tree.remove(a);
        assert!(!tree.is_alive(a));
        assert!(!tree.is_alive(a_child), "subtree goes with its root");
        assert!(tree.children(root).is_empty());

        let b = tree.insert(Some(root), boxed(0.0, 0.0, 1.0, 1.0));
        assert!(tree.is_alive(b));
        assert!(!tree.is_alive(a));
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
        assert_eq!(tree.attr(a, "id"), None);
    }

    #[test]
    fn reparent_moves_and_rejects_cycles() {
        let mut tree = Tree::new();
        let root = tree.insert(None, boxed(0.0, 0.0, 1.0, 1.0));
        let a = tree.insert(Some(root), LocalNode::default());
        let b = tree.insert(Some(a), LocalNode::default());
        let layer = tree.insert(Some(root), LocalNode::default());

        assert!(!tree.reparent(a, Some(b)), "cannot move into own subtree");
        assert!(tree.reparent(b, Some(layer)));
        assert_eq!(tree.parent(b), Some(layer));
        assert!(tree.children(a).is_empty());
        assert!(tree.contains(root, b));
        assert!(!tree.contains(a, b));
    }

    #[test]
    fn attribute_queries_follow_document_order() {
        let mut tree = Tree::new();
        let root = tree.insert(None, LocalNode::default());
        let first = tree.insert(Some(root), LocalNode::default().attr("data-id", "x"));
        let _second = tree.insert(Some(root), LocalNode::default().attr("data-id", "x"));
        assert_eq!(tree.find_by_attr(root, "data-id", "x"), Some(first));

        tree.set_attr(first, "data-id", "y");
        assert_eq!(tree.attr(first, "data-id"), Some("y"));
        tree.remove_attr(first, "data-id");
        assert!(!tree.has_attr(first, "data-id"));

        tree.set_style(first, "left", Some("4px"));
        assert_eq!(tree.style(first, "left"), Some("4px"));
        tree.set_style(first, "left", None);
        assert_eq!(tree.style(first, "left"), None);
    }

    #[test]
    fn descendants_are_preorder() {
        let mut tree = Tree::new();
        let root = tree.insert(None, LocalNode::default());
        let a = tree.insert(Some(root), LocalNode::default());
        let a1 = tree.insert(Some(a), LocalNode::default());
        let b = tree.insert(Some(root), LocalNode::default());
        assert_eq!(tree.descendants(root), alloc::vec![root, a, a1, b]);
        assert_eq!(tree.path_to_root(a1), alloc::vec![root, a, a1]);
    }
}
