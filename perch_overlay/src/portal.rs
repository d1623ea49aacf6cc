// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared top-level container open overlay content is moved into.

use std::collections::HashMap;

use perch_tree::{LocalNode, NodeFlags, NodeId, Tree};

use crate::config::attr;

/// Lazily created, fixed, non-pickable container under the document root.
///
/// Content parented here is positioned in document space and is not clipped or
/// out-stacked by the ancestors it was rendered under.
///
/// The portal remembers where each piece of content was rendered (its home) before it
/// was moved, so a markup swap can tell which subtree owns portaled content.
#[derive(Debug, Default)]
pub struct Portal {
    container: Option<NodeId>,
    homes: HashMap<NodeId, NodeId>,
}

impl Portal {
    /// Portal with no container yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The container, if it has been created and is still attached.
    pub fn container(&self, tree: &Tree) -> Option<NodeId> {
        self.container.filter(|&c| tree.is_alive(c))
    }

    /// Find or create the container.
    ///
    /// A container already present in the markup is adopted instead of creating a second one.
    pub fn ensure(&mut self, tree: &mut Tree, document: NodeId, z_index: i32) -> NodeId {
        if let Some(c) = self.container(tree) {
            return c;
        }
        let container = match tree.find_first(document, |t, n| t.has_attr(n, attr::PORTAL)) {
            Some(existing) => existing,
            None => {
                let mut local = LocalNode::with_bounds(
                    tree.local_bounds(document).unwrap_or_default(),
                )
                .attr(attr::PORTAL, "")
                .flags(NodeFlags::VISIBLE);
                local.z_index = z_index;
                let created = tree.insert(Some(document), local);
                tracing::trace!(?created, "created portal container");
                created
            }
        };
        self.container = Some(container);
        container
    }

    /// Move `content` under the container unless it already is a direct child.
    ///
    /// The first move records the content's former parent as its home.
    pub fn attach(&mut self, tree: &mut Tree, document: NodeId, content: NodeId, z_index: i32) {
        let container = self.ensure(tree, document, z_index);
        self.homes.retain(|&c, _| tree.is_alive(c));
        if tree.parent(content) == Some(container) {
            return;
        }
        match tree.parent(content) {
            Some(home) => {
                self.homes.insert(content, home);
            }
            None => {
                self.homes.remove(&content);
            }
        }
        tree.reparent(content, Some(container));
    }

    /// Where portaled `content` was rendered before it was moved.
    pub fn home(&self, tree: &Tree, content: NodeId) -> Option<NodeId> {
        if !self.holds(tree, content) {
            return None;
        }
        self.homes.get(&content).copied()
    }

    /// Portaled content whose home satisfies `owned`.
    pub fn homed_in(&self, tree: &Tree, owned: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let mut out: Vec<_> = self
            .homes
            .iter()
            .filter(|&(&content, &home)| self.holds(tree, content) && owned(home))
            .map(|(&content, _)| content)
            .collect();
        out.sort();
        out
    }

    /// Returns true if `content` is a direct child of the container.
    pub fn holds(&self, tree: &Tree, content: NodeId) -> bool {
        self.container(tree)
            .is_some_and(|c| tree.parent(content) == Some(c))
    }

    /// Remove portaled `content` from the tree. Content elsewhere is left alone.
    pub fn detach(&mut self, tree: &mut Tree, content: NodeId) -> bool {
        if !self.holds(tree, content) {
            return false;
        }
        self.homes.remove(&content);
        tree.remove(content);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn document() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let doc = tree.insert(
            None,
            LocalNode::with_bounds(Rect::new(0.0, 0.0, 640.0, 480.0)),
        );
        (tree, doc)
    }

    #[test]
    fn ensure_is_idempotent() {
        let (mut tree, doc) = document();
        let mut portal = Portal::new();
        let a = portal.ensure(&mut tree, doc, 10);
        let b = portal.ensure(&mut tree, doc, 10);
        assert_eq!(a, b);
        assert_eq!(tree.children(doc), &[a]);
        let flags = tree.flags(a).unwrap();
        assert!(!flags.contains(NodeFlags::PICKABLE), "container never intercepts");
        assert_eq!(tree.local_bounds(a), Some(Rect::new(0.0, 0.0, 640.0, 480.0)));
    }

    #[test]
    fn existing_container_is_adopted() {
        let (mut tree, doc) = document();
        let existing = tree.insert(Some(doc), LocalNode::default().attr(attr::PORTAL, ""));
        let mut portal = Portal::new();
        assert_eq!(portal.ensure(&mut tree, doc, 10), existing);
        assert_eq!(tree.children(doc).len(), 1);
    }

    #[test]
    fn attach_moves_once_and_detach_removes() {
        let (mut tree, doc) = document();
        let section = tree.insert(Some(doc), LocalNode::default());
        let content = tree.insert(Some(section), LocalNode::default());
        let mut portal = Portal::new();
        portal.attach(&mut tree, doc, content, 10);
        portal.attach(&mut tree, doc, content, 10);
        assert!(portal.holds(&tree, content));
        assert!(tree.children(section).is_empty());

        assert!(portal.detach(&mut tree, content));
        assert!(!tree.is_alive(content));
        assert!(!portal.detach(&mut tree, content));
    }

    #[test]
    fn attach_records_the_original_home_once() {
        let (mut tree, doc) = document();
        let panel = tree.insert(Some(doc), LocalNode::default());
        let content = tree.insert(Some(panel), LocalNode::default());
        let mut portal = Portal::new();
        assert_eq!(portal.home(&tree, content), None);

        portal.attach(&mut tree, doc, content, 10);
        portal.attach(&mut tree, doc, content, 10);
        assert_eq!(portal.home(&tree, content), Some(panel));
        assert_eq!(portal.homed_in(&tree, |h| h == panel), vec![content]);
        assert!(portal.homed_in(&tree, |h| h == doc).is_empty());

        assert!(portal.detach(&mut tree, content));
        assert!(portal.homed_in(&tree, |_| true).is_empty());
    }

    #[test]
    fn removed_container_is_recreated() {
        let (mut tree, doc) = document();
        let mut portal = Portal::new();
        let first = portal.ensure(&mut tree, doc, 10);
        tree.remove(first);
        let second = portal.ensure(&mut tree, doc, 10);
        assert_ne!(first, second);
        assert!(tree.is_alive(second));
    }
}
