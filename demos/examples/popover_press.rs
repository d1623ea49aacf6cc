// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Press-activated popovers: open, dismiss, exclusive families, and markup swaps.
//!
//! Run:
//! - `RUST_LOG=perch_overlay=debug cargo run -p perch_demos --example popover_press`

use std::time::Duration;

use kurbo::{Point, Rect};
use perch_overlay::OverlayContext;
use perch_overlay::config::{ContextConfig, attr};
use perch_overlay::geometry::{ComputedPosition, GeometryError, PositionRequest};
use perch_overlay::types::Key;
use perch_tree::{LocalNode, NodeFlags, NodeId, Tree};
use tracing_subscriber::EnvFilter;

/// Below the reference, flipped above when it would leave the viewport.
fn place(req: &PositionRequest) -> Result<ComputedPosition, GeometryError> {
    let mut placement = req.placement;
    let mut y = req.reference.y1;
    if y + req.floating.height > 800.0 {
        placement.side = placement.side.opposite();
        y = req.reference.y0 - req.floating.height;
    }
    Ok(ComputedPosition {
        origin: Point::new(req.reference.x0, y),
        placement,
        arrow: None,
    })
}

fn menu(tree: &mut Tree, parent: NodeId, id: &str, x: f64) -> NodeId {
    let trigger = tree.insert(
        Some(parent),
        LocalNode::with_bounds(Rect::new(x, 10.0, x + 80.0, 40.0))
            .attr(attr::TRIGGER, "")
            .attr(attr::FOR, id),
    );
    tree.insert(
        Some(parent),
        LocalNode::with_bounds(Rect::new(0.0, 0.0, 160.0, 120.0))
            .attr(attr::CONTENT_ID, id)
            .flags(NodeFlags::PICKABLE),
    );
    trigger
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut cx = OverlayContext::with_engine(ContextConfig::default(), place);
    let doc = cx.document();
    let header = cx.tree_mut().insert(Some(doc), LocalNode::default());
    let file = menu(cx.tree_mut(), header, "file", 10.0);
    let edit = menu(cx.tree_mut(), header, "edit", 100.0);
    println!("bound {} triggers", cx.bind(doc));

    cx.click(file);
    println!("file open: {}", cx.is_open("file"));
    cx.click(edit);
    println!(
        "after opening edit -> file open: {}, edit open: {}",
        cx.is_open("file"),
        cx.is_open("edit")
    );

    cx.tick();
    cx.pointer_down_at(Point::new(900.0, 600.0));
    println!("outside click -> edit open: {}", cx.is_open("edit"));
    cx.advance(Duration::from_millis(150));

    cx.click(file);
    cx.key_down(Key::Escape, None);
    println!("escape -> file open: {}", cx.is_open("file"));

    cx.click(file);
    let torn_down = cx.before_swap(header);
    cx.tree_mut().remove(header);
    println!(
        "swapped header out: {torn_down} overlays torn down, {} subscriptions and {} tasks left",
        cx.ledger().len(),
        cx.pending_tasks()
    );
}
