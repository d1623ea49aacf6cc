// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element tree basics.
//!
//! Build a small document, query attributes, move an element, and hit-test.
//!
//! Run:
//! - `cargo run -p perch_demos --example tree_basics`

use kurbo::{Affine, Point, Rect, Vec2};
use perch_tree::{LocalNode, NodeFlags, QueryFilter, Tree};

fn main() {
    let mut tree = Tree::new();
    let body = tree.insert(None, LocalNode::with_bounds(Rect::new(0.0, 0.0, 400.0, 300.0)));
    let toolbar = tree.insert(
        Some(body),
        LocalNode::with_bounds(Rect::new(0.0, 0.0, 400.0, 40.0)).attr("role", "toolbar"),
    );
    let button = tree.insert(
        Some(toolbar),
        LocalNode::with_bounds(Rect::new(10.0, 5.0, 90.0, 35.0)).attr("role", "button"),
    );
    let hidden = tree.insert(
        Some(body),
        LocalNode::with_bounds(Rect::new(0.0, 0.0, 400.0, 300.0)).flags(NodeFlags::PICKABLE),
    );

    assert_eq!(tree.find_by_attr(body, "role", "button"), Some(button));
    println!("path to button: {:?}", tree.path_to_root(button));

    // Hidden elements never take the hit, even when they cover the point.
    let hit = tree
        .hit_test_point(Point::new(50.0, 20.0), QueryFilter::POINTER)
        .unwrap();
    println!("hit: {:?}", hit.node);
    assert_eq!(hit.node, button);
    assert!(!tree.is_displayed(hidden));

    tree.set_local_transform(toolbar, Affine::translate(Vec2::new(0.0, 100.0)));
    println!("button moved to {:?}", tree.world_bounds(button));
    assert_eq!(
        tree.world_bounds(button),
        Some(Rect::new(10.0, 105.0, 90.0, 135.0))
    );

    tree.remove(toolbar);
    assert!(!tree.is_alive(button), "removal takes the whole subtree");
}
