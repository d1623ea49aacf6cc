// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover intent on a virtual clock.
//!
//! The pointer crosses the trigger too fast to open the card, then rests on it,
//! moves into the card, and finally leaves both.
//!
//! Run:
//! - `RUST_LOG=perch_overlay=trace cargo run -p perch_demos --example hover_card`

use std::time::Duration;

use kurbo::{Point, Rect};
use perch_overlay::OverlayContext;
use perch_overlay::config::{ContextConfig, attr};
use perch_overlay::geometry::{ComputedPosition, GeometryError, PositionRequest};
use perch_tree::{LocalNode, NodeFlags};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let engine = |req: &PositionRequest| -> Result<ComputedPosition, GeometryError> {
        Ok(ComputedPosition {
            origin: Point::new(req.reference.x0, req.reference.y1),
            placement: req.placement,
            arrow: None,
        })
    };
    let mut cx = OverlayContext::with_engine(ContextConfig::default(), engine);
    let doc = cx.document();
    let tree = cx.tree_mut();
    let avatar = tree.insert(
        Some(doc),
        LocalNode::with_bounds(Rect::new(20.0, 20.0, 60.0, 60.0))
            .attr(attr::TRIGGER, "")
            .attr(attr::FOR, "profile")
            .attr(attr::TYPE, "hover"),
    );
    let card = tree.insert(
        Some(doc),
        LocalNode::with_bounds(Rect::new(0.0, 0.0, 200.0, 100.0))
            .attr(attr::CONTENT_ID, "profile")
            .attr(attr::HOVER_DELAY, "150")
            .flags(NodeFlags::PICKABLE),
    );
    cx.bind(doc);
    let ms = Duration::from_millis;

    cx.pointer_move(Some(avatar));
    cx.advance(ms(80));
    cx.pointer_move(None);
    cx.advance(ms(500));
    println!("quick pass -> open: {}", cx.is_open("profile"));

    cx.pointer_move_at(Point::new(40.0, 40.0));
    cx.advance(ms(150));
    println!("rest on avatar -> open: {}", cx.is_open("profile"));
    println!("card at {:?}", cx.tree().world_bounds(card));

    cx.pointer_move(Some(card));
    cx.advance(ms(500));
    println!("inside card -> open: {}", cx.is_open("profile"));

    cx.pointer_move(None);
    cx.advance(ms(200));
    println!(
        "left both -> open: {}, live resources: {}",
        cx.is_open("profile"),
        cx.live_resources("profile")
    );
}
