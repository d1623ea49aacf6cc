// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer hover tracking: enter/leave transitions with related targets.
//!
//! The pointer's position is described by the root→target path of the element under it.
//! When that path changes, [`HoverTracker::update_path`] yields the minimal set of
//! transitions. Each leave carries the element the pointer moved to, and each enter
//! carries the element it came from, so hover-intent code can tell "moved from the
//! trigger into its content" apart from "left both".
//!
//! ```
//! use perch_overlay::hover::{HoverTracker, HoverTransition};
//! let mut h: HoverTracker<u32> = HoverTracker::new();
//! let _ = h.update_path(&[1, 2]);
//! assert_eq!(
//!     h.update_path(&[1, 3]),
//!     vec![
//!         HoverTransition::Leave { node: 2, related: Some(3) },
//!         HoverTransition::Enter { node: 3, related: Some(2) },
//!     ]
//! );
//! ```

/// Tracks the hovered path and diffs it against new paths.
///
/// Ordering semantics:
/// - Leave events are emitted from inner-most to outer-most.
/// - Enter events are emitted from outer-most to inner-most.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoverTracker<K: Copy + Eq> {
    current: Vec<K>,
}

/// A hover transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoverTransition<K> {
    /// Pointer enters `node`, coming from `related` (the previous innermost target).
    Enter {
        /// Element entered.
        node: K,
        /// Previous innermost target, if any.
        related: Option<K>,
    },
    /// Pointer leaves `node`, going to `related` (the new innermost target).
    Leave {
        /// Element left.
        node: K,
        /// New innermost target, if any.
        related: Option<K>,
    },
}

impl<K: Copy + Eq> HoverTracker<K> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            current: Vec::new(),
        }
    }

    /// Current root→target path (if any).
    pub fn current_path(&self) -> &[K] {
        &self.current
    }

    /// Innermost hovered element.
    pub fn target(&self) -> Option<K> {
        self.current.last().copied()
    }

    /// Clear the hovered path, returning leave events from inner-most to outer-most.
    pub fn clear(&mut self) -> Vec<HoverTransition<K>> {
        self.update_path(&[])
    }

    /// Drop `node` and everything below it from the hovered path without emitting events.
    ///
    /// Used when a subtree is torn down under the pointer.
    pub fn forget(&mut self, node: K) {
        if let Some(pos) = self.current.iter().position(|&k| k == node) {
            self.current.truncate(pos);
        }
    }

    /// Update the hovered path and return the transitions from the previous path.
    pub fn update_path(&mut self, new_path: &[K]) -> Vec<HoverTransition<K>> {
        // Length of the shared ancestry (depth of the lowest common ancestor).
        let mut lca = 0;
        while lca < self.current.len() && lca < new_path.len() && self.current[lca] == new_path[lca]
        {
            lca += 1;
        }

        let old_target = self.current.last().copied();
        let new_target = new_path.last().copied();
        let mut out = Vec::new();
        for &node in self.current[lca..].iter().rev() {
            out.push(HoverTransition::Leave {
                node,
                related: new_target,
            });
        }
        for &node in &new_path[lca..] {
            out.push(HoverTransition::Enter {
                node,
                related: old_target,
            });
        }

        self.current.clear();
        self.current.extend_from_slice(new_path);
        out
    }
}
