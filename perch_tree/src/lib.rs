// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Perch Tree: a headless element tree for behavior code.
//!
//! Server-rendered markup arrives as a tree of elements carrying attributes.
//! Behavior layers (overlays, menus, select boxes) read those attributes, move elements
//! around, toggle their visibility, and write inline style back.
//! This crate holds that tree without any rendering or layout of its own.
//!
//! - Represents a hierarchy of elements with layout boxes, local transforms, z-order, and flags.
//! - Stores markup attributes and inline style properties per element.
//! - Provides hit testing over world-space boxes, and containment/ancestry queries.
//!
//! ## Not a layout engine
//!
//! Upstream code computes layout boxes and hands them over through [`LocalNode::local_bounds`].
//! Behavior code positions floating elements by writing a local transform.
//!
//! ## API overview
//!
//! - [`Tree`]: container managing elements.
//! - [`LocalNode`]: per-element data (bounds, transform, z, flags, attributes, style).
//! - [`NodeFlags`]: visibility and picking controls.
//! - [`NodeId`]: generational handle of an element; stale once the element is removed.
//! - [`QueryFilter`]: restricts hit results (displayed/pickable).
//!
//! ### Minimal usage
//!
//! ```
//! use perch_tree::{LocalNode, QueryFilter, Tree};
//! use kurbo::{Affine, Point, Rect, Vec2};
//!
//! let mut tree = Tree::new();
//! let body = tree.insert(None, LocalNode::with_bounds(Rect::new(0.0, 0.0, 800.0, 600.0)));
//! let button = tree.insert(
//!     Some(body),
//!     LocalNode::with_bounds(Rect::new(10.0, 10.0, 90.0, 40.0)).attr("data-role", "button"),
//! );
//!
//! assert_eq!(tree.find_by_attr(body, "data-role", "button"), Some(button));
//!
//! tree.set_local_transform(button, Affine::translate(Vec2::new(100.0, 0.0)));
//! let hit = tree.hit_test_point(Point::new(150.0, 20.0), QueryFilter::POINTER).unwrap();
//! assert_eq!(hit.node, button);
//! assert_eq!(hit.path, vec![body, button]);
//!
//! tree.remove(button);
//! assert!(!tree.is_alive(button));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod tree;
mod types;

pub use tree::{Hit, QueryFilter, Tree};
pub use types::{LocalNode, NodeFlags, NodeId, Properties};
