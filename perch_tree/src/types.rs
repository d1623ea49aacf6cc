// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the element tree: node identifiers, flags, and per-element data.

use alloc::collections::BTreeMap;
use alloc::string::String;
use kurbo::{Affine, Rect};

/// Identifier for an element in the tree.
///
/// This is a small, copyable handle that stays stable while the element is attached
/// but becomes invalid when the element is removed.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// A stale `NodeId` never aliases a different live element because the generation must match.
/// Use [`Tree::is_alive`](crate::Tree::is_alive) to check whether an element is still attached.
///
/// ### Newer
///
/// A `NodeId` is considered newer than another when it has a higher generation.
/// If generations are equal, the one with the higher slot index is considered newer.
/// This order is used only for deterministic tie-breaks in
/// [hit testing](crate::Tree::hit_test_point).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn is_newer_than(self, other: Self) -> bool {
        (self.1 > other.1) || (self.1 == other.1 && self.0 > other.0)
    }
}

bitflags::bitflags! {
    /// Element flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Element is displayed. Hidden elements hide their whole subtree.
        const VISIBLE  = 0b0000_0001;
        /// Element intercepts pointer input (participates in hit testing).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// String key/value pairs, used for both markup attributes and style properties.
pub type Properties = BTreeMap<String, String>;

/// Per-element data supplied by the markup layer.
#[derive(Clone, Debug)]
pub struct LocalNode {
    /// Layout box in parent space, before the local transform is applied.
    pub local_bounds: Rect,
    /// Local transform relative to parent space.
    pub local_transform: Affine,
    /// Stacking order among overlapping elements. Higher is on top.
    pub z_index: i32,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
    /// Markup attributes (`data-*`, `aria-*`, ...).
    pub attributes: Properties,
    /// Inline style properties written by behavior code.
    pub style: Properties,
}

impl Default for LocalNode {
    fn default() -> Self {
        Self {
            local_bounds: Rect::ZERO,
            local_transform: Affine::IDENTITY,
            z_index: 0,
            flags: NodeFlags::default(),
            attributes: Properties::new(),
            style: Properties::new(),
        }
    }
}

impl LocalNode {
    /// Element with the given bounds and default everything else.
    pub fn with_bounds(local_bounds: Rect) -> Self {
        Self {
            local_bounds,
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style flag setter.
    #[must_use]
    pub fn flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }
}
