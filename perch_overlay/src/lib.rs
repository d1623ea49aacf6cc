// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Perch Overlay: lifecycle coordination for anchored overlays.
//!
//! ## Overview
//!
//! Popovers, dropdown menus and select panels are declared in markup: a trigger element
//! names the overlay it controls with `data-popover-for`, and the content element carries
//! the matching `data-popover-id`. This crate binds those triggers, opens and closes the
//! content, keeps it anchored to its trigger while open, and guarantees that every
//! listener and timer an overlay acquired is released when it closes or when its markup
//! is swapped out.
//!
//! Placement math is not done here. A [`GeometryEngine`](crate::geometry::GeometryEngine)
//! receives the reference box, the floating size and a middleware pipeline, and returns
//! the position the coordinator writes back onto the content.
//!
//! ## Lifecycle
//!
//! - Opening makes the content visible, moves it into the shared portal container,
//!   positions it once, then starts per-frame tracking. The escape listener attaches at
//!   once; the outside-click listener attaches on the next tick so the opening click
//!   does not dismiss the overlay.
//! - Closing releases every open-scoped subscription and pending timer. A non-immediate
//!   close keeps the content visible for the exit transition.
//! - Overlays in the same family are exclusive: opening one closes the others first.
//! - Only one open/close transition runs at a time; a transition requested while
//!   another is unfinished is rejected and logged.
//!
//! ## Time
//!
//! There are no wall-clock timers. Hover intent, click-away arming, the exit transition,
//! and engine retries are tasks on a virtual clock the host advances with
//! [`OverlayContext::advance`].
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//!
//! use kurbo::{Point, Rect};
//! use perch_overlay::OverlayContext;
//! use perch_overlay::config::{ContextConfig, attr};
//! use perch_overlay::geometry::{ComputedPosition, GeometryError, PositionRequest};
//! use perch_overlay::types::Key;
//! use perch_tree::LocalNode;
//!
//! let below = |req: &PositionRequest| -> Result<ComputedPosition, GeometryError> {
//!     Ok(ComputedPosition {
//!         origin: Point::new(req.reference.x0, req.reference.y1),
//!         placement: req.placement,
//!         arrow: None,
//!     })
//! };
//! let mut cx = OverlayContext::with_engine(ContextConfig::default(), below);
//! let doc = cx.document();
//! let tree = cx.tree_mut();
//! let trigger = tree.insert(
//!     Some(doc),
//!     LocalNode::with_bounds(Rect::new(10.0, 10.0, 90.0, 40.0))
//!         .attr(attr::TRIGGER, "")
//!         .attr(attr::FOR, "menu"),
//! );
//! let _content = tree.insert(
//!     Some(doc),
//!     LocalNode::with_bounds(Rect::new(0.0, 0.0, 120.0, 200.0)).attr(attr::CONTENT_ID, "menu"),
//! );
//! assert_eq!(cx.bind(doc), 1);
//!
//! cx.click(trigger);
//! assert!(cx.is_open("menu"));
//!
//! cx.key_down(Key::Escape, None);
//! assert!(!cx.is_open("menu"));
//! cx.advance(Duration::from_millis(150));
//! assert_eq!(cx.live_resources("menu"), 0);
//! ```

mod adapter;
mod binder;
mod context;
mod lifecycle;

pub mod config;
pub mod error;
pub mod geometry;
pub mod hover;
pub mod portal;
pub mod registry;
pub mod scheduler;
pub mod subscription;
pub mod types;
pub mod widgets;

pub use context::OverlayContext;
pub use error::OverlayError;
pub use registry::{LifecyclePhase, OverlayState};
pub use types::OverlayIdentity;
