// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interface to the placement engine, plus the arrow post-processing the coordinator owns.
//!
//! The coordinator does not compute placements itself. It describes the reference box,
//! the floating size, the preferred [`Placement`], and a [`Middleware`] pipeline, then
//! hands that to a [`GeometryEngine`] once when an overlay opens and again on every
//! frame while it stays open.
//!
//! Closures implement the trait, which keeps test doubles short:
//!
//! ```
//! use kurbo::Point;
//! use perch_overlay::geometry::{ComputedPosition, GeometryEngine, GeometryError, PositionRequest};
//!
//! let below = |req: &PositionRequest| -> Result<ComputedPosition, GeometryError> {
//!     Ok(ComputedPosition {
//!         origin: Point::new(req.reference.x0, req.reference.y1),
//!         placement: req.placement,
//!         arrow: None,
//!     })
//! };
//! # fn takes(_: &dyn GeometryEngine) {}
//! # takes(&below);
//! ```

use std::fmt;
use std::str::FromStr;

use kurbo::{Point, Rect, Size};
use perch_tree::{NodeId, Tree};
use thiserror::Error;

/// Errors reported by placement parsing or by the engine.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A placement string that names no side.
    #[error("unknown placement `{0}`")]
    InvalidPlacement(String),
    /// The reference element has no layout box.
    #[error("reference element has no layout box")]
    MissingReference,
    /// Engine-specific failure.
    #[error("placement engine failed: {0}")]
    Engine(String),
}

/// Side of the reference box the floating element is placed against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Above the reference.
    Top,
    /// Right of the reference.
    Right,
    /// Below the reference.
    Bottom,
    /// Left of the reference.
    Left,
}

impl Side {
    /// The side facing this one.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// CSS property name for this side.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

/// Alignment along the placement side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Align to the start edge.
    Start,
    /// Align to the end edge.
    End,
}

/// A side plus an optional alignment, written `bottom`, `top-start`, `left-end`, ...
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Placement {
    /// Side of the reference.
    pub side: Side,
    /// Alignment along that side; `None` centers.
    pub alignment: Option<Alignment>,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            side: Side::Bottom,
            alignment: None,
        }
    }
}

impl FromStr for Placement {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, alignment) = match s.trim().split_once('-') {
            Some((side, align)) => (side, Some(align)),
            None => (s.trim(), None),
        };
        let side = match side {
            "top" => Side::Top,
            "right" => Side::Right,
            "bottom" => Side::Bottom,
            "left" => Side::Left,
            _ => return Err(GeometryError::InvalidPlacement(s.into())),
        };
        let alignment = match alignment {
            None => None,
            Some("start") => Some(Alignment::Start),
            Some("end") => Some(Alignment::End),
            Some(_) => return Err(GeometryError::InvalidPlacement(s.into())),
        };
        Ok(Self { side, alignment })
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.side.as_str())?;
        match self.alignment {
            Some(Alignment::Start) => f.write_str("-start"),
            Some(Alignment::End) => f.write_str("-end"),
            None => Ok(()),
        }
    }
}

/// One step of the positioning pipeline, applied by the engine in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Middleware {
    /// Gap between reference and floating element along the placement axis.
    Offset(f64),
    /// Flip to the opposite side when the preferred side overflows.
    Flip {
        /// Minimum distance to keep from the viewport edge.
        padding: f64,
    },
    /// Slide along the placement side to stay inside the viewport.
    Shift {
        /// Minimum distance to keep from the viewport edge.
        padding: f64,
    },
    /// Compute an arrow position pointing at the reference.
    Arrow {
        /// Size of the arrow element.
        size: Size,
        /// Minimum distance between the arrow and the floating element's corners.
        padding: f64,
    },
}

/// Everything the engine needs for one placement computation.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionRequest {
    /// World-space box of the reference element.
    pub reference: Rect,
    /// Size of the floating element.
    pub floating: Size,
    /// Preferred placement.
    pub placement: Placement,
    /// Pipeline steps.
    pub middleware: Vec<Middleware>,
}

/// Arrow offsets produced by the [`Middleware::Arrow`] step.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ArrowData {
    /// Horizontal offset inside the floating element, for vertical placements.
    pub x: Option<f64>,
    /// Vertical offset inside the floating element, for horizontal placements.
    pub y: Option<f64>,
}

/// Result of a placement computation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComputedPosition {
    /// World-space origin for the floating element.
    pub origin: Point,
    /// Final placement, which may differ from the request after flipping.
    pub placement: Placement,
    /// Arrow offsets, when the pipeline had an arrow step.
    pub arrow: Option<ArrowData>,
}

/// The placement engine consumed by the coordinator.
pub trait GeometryEngine {
    /// Compute the floating element's position.
    fn compute_position(&self, request: &PositionRequest)
    -> Result<ComputedPosition, GeometryError>;
}

impl<F> GeometryEngine for F
where
    F: Fn(&PositionRequest) -> Result<ComputedPosition, GeometryError>,
{
    fn compute_position(
        &self,
        request: &PositionRequest,
    ) -> Result<ComputedPosition, GeometryError> {
        self(request)
    }
}

/// Inline style for an arrow element, derived from the final placement.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ArrowStyle {
    /// `left` offset, if the engine produced one.
    pub left: Option<f64>,
    /// `top` offset, if the engine produced one.
    pub top: Option<f64>,
    /// Side pinned to the floating element's edge, facing the reference.
    pub static_side: Side,
}

impl ArrowStyle {
    /// Arrow style for a final placement and the engine's arrow data.
    pub fn new(placement: Placement, data: ArrowData) -> Self {
        Self {
            left: data.x,
            top: data.y,
            static_side: placement.side.opposite(),
        }
    }

    /// Write the style onto `arrow`, pinning the static side at `inset`.
    pub fn apply(&self, tree: &mut Tree, arrow: NodeId, inset: f64) {
        let left = self.left.map(px);
        let top = self.top.map(px);
        tree.set_style(arrow, "left", left.as_deref());
        tree.set_style(arrow, "top", top.as_deref());
        tree.set_style(arrow, "right", None);
        tree.set_style(arrow, "bottom", None);
        tree.set_style(arrow, self.static_side.as_str(), Some(&px(inset)));
    }
}

pub(crate) fn px(v: f64) -> String {
    format!("{v}px")
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_tree::LocalNode;

    #[test]
    fn placement_parses_side_and_alignment() {
        let p: Placement = "top-start".parse().unwrap();
        assert_eq!(p.side, Side::Top);
        assert_eq!(p.alignment, Some(Alignment::Start));
        assert_eq!(p.to_string(), "top-start");

        let p: Placement = "left".parse().unwrap();
        assert_eq!(p.alignment, None);
        assert_eq!(p.to_string(), "left");

        assert!("middle".parse::<Placement>().is_err());
        assert!("top-center".parse::<Placement>().is_err());
    }

    #[test]
    fn arrow_pins_side_facing_reference() {
        let placement: Placement = "top".parse().unwrap();
        let style = ArrowStyle::new(
            placement,
            ArrowData {
                x: Some(12.0),
                y: None,
            },
        );
        assert_eq!(style.static_side, Side::Bottom);

        let mut tree = Tree::new();
        let arrow = tree.insert(None, LocalNode::default());
        tree.set_style(arrow, "top", Some("3px"));
        style.apply(&mut tree, arrow, -5.0);
        assert_eq!(tree.style(arrow, "left"), Some("12px"));
        assert_eq!(tree.style(arrow, "top"), None, "stale offsets are cleared");
        assert_eq!(tree.style(arrow, "bottom"), Some("-5px"));
    }

    #[test]
    fn closures_act_as_engines() {
        let engine = |req: &PositionRequest| -> Result<ComputedPosition, GeometryError> {
            Ok(ComputedPosition {
                origin: Point::new(req.reference.x1, req.reference.y0),
                placement: req.placement,
                arrow: None,
            })
        };
        let req = PositionRequest {
            reference: Rect::new(0.0, 0.0, 10.0, 10.0),
            floating: Size::new(5.0, 5.0),
            placement: Placement::default(),
            middleware: vec![Middleware::Offset(4.0)],
        };
        let out = engine.compute_position(&req).unwrap();
        assert_eq!(out.origin, Point::new(10.0, 0.0));
    }
}
