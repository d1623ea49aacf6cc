// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hooks for markup layers that replace parts of the document.
//!
//! Call [`OverlayContext::before_swap`] with the root of a subtree about to be removed
//! and [`OverlayContext::after_swap`] with the root of the subtree that replaced it.
//! [`OverlayContext::replace_subtree`] does both around a removal and a rebuild.

use std::collections::{BTreeSet, HashSet};

use perch_tree::{NodeId, Tree};

use crate::config::attr;
use crate::context::OverlayContext;
use crate::types::OverlayIdentity;

impl OverlayContext {
    /// Tear down every overlay whose trigger or content is rooted under `node`.
    ///
    /// Content counts as rooted under `node` when it lies there now, or when it was
    /// rendered there before being moved into the portal. Affected overlays are closed
    /// immediately and removed from the registry, with all their subscriptions and
    /// timers released, and portaled content rendered under `node` is removed.
    /// Content rendered elsewhere stays in the portal for the next bind pass.
    /// Returns the number of registry entries removed.
    pub fn before_swap(&mut self, node: NodeId) -> usize {
        if !self.tree.is_alive(node) {
            return 0;
        }
        let subtree: HashSet<NodeId> = self.tree.descendants(node).into_iter().collect();
        let portaled = self.portal.homed_in(&self.tree, |home| subtree.contains(&home));

        let mut doomed: BTreeSet<OverlayIdentity> = BTreeSet::new();
        for &n in subtree.iter().chain(&portaled) {
            if let Some(binding) = self.bindings.triggers.get(&n) {
                doomed.insert(binding.identity.clone());
            }
            if let Some(id) = self.tree.attr(n, attr::CONTENT_ID) {
                doomed.insert(OverlayIdentity::new(id));
            }
        }
        for (id, state) in self.registry.iter() {
            if subtree.contains(&state.trigger)
                || subtree.contains(&state.content)
                || portaled.contains(&state.content)
            {
                doomed.insert(id.clone());
            }
        }

        let removed = doomed.iter().filter(|id| self.teardown(id)).count();
        for &n in subtree.iter().chain(&portaled) {
            self.unbind_trigger(n);
            self.unbind_content(n);
        }
        for &content in &portaled {
            self.hover.forget(content);
            self.portal.detach(&mut self.tree, content);
        }
        self.hover.forget(node);
        tracing::debug!(?node, overlays = removed, portaled = portaled.len(), "subtree torn down");
        removed
    }

    /// Bind triggers in a freshly inserted subtree.
    pub fn after_swap(&mut self, node: NodeId) -> usize {
        self.bind(node)
    }

    /// Bind triggers in a subtree swapped in out of band (outside the swap target).
    pub fn oob_after_swap(&mut self, node: NodeId) -> usize {
        self.after_swap(node)
    }

    /// Remove `old` and insert a replacement built by `build`, which receives the
    /// tree and the parent `old` had.
    pub fn replace_subtree(
        &mut self,
        old: NodeId,
        build: impl FnOnce(&mut Tree, Option<NodeId>) -> NodeId,
    ) -> NodeId {
        let parent = self.tree.parent(old);
        self.before_swap(old);
        self.tree.remove(old);
        let replacement = build(&mut self.tree, parent);
        self.after_swap(replacement);
        replacement
    }

    /// Close and forget `id`. Returns true if it had a registry entry.
    fn teardown(&mut self, id: &OverlayIdentity) -> bool {
        if let Err(err) = self.try_close(id, true) {
            tracing::trace!(overlay = %id, %err, "nothing to close");
        }
        let Some(state) = self.registry.remove(id) else {
            return false;
        };
        let content = state.content;
        state.dispose(&mut self.ledger, &mut self.scheduler);
        self.unbind_content(content);
        true
    }
}
