// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration: context-wide defaults and per-overlay settings read from markup.

use std::time::Duration;

use kurbo::Rect;
use perch_tree::{NodeId, Tree};

use crate::geometry::Placement;
use crate::types::Family;

/// Markup attribute names read and written by the coordinator.
pub mod attr {
    /// Marks an element as an overlay trigger.
    pub const TRIGGER: &str = "data-popover-trigger";
    /// Identity of the overlay a trigger controls.
    pub const FOR: &str = "data-popover-for";
    /// Activation mode of a trigger (`press`, `click`, `hover`).
    pub const TYPE: &str = "data-popover-type";
    /// Identity carried by overlay content.
    pub const CONTENT_ID: &str = "data-popover-id";
    /// Preferred placement of the content.
    pub const PLACEMENT: &str = "data-popover-placement";
    /// Distance between trigger and content.
    pub const OFFSET: &str = "data-popover-offset";
    /// Hover open delay in milliseconds.
    pub const HOVER_DELAY: &str = "data-popover-hover-delay";
    /// Hover close delay in milliseconds.
    pub const HOVER_OUT_DELAY: &str = "data-popover-hover-out-delay";
    /// `true` disables outside-click dismissal.
    pub const DISABLE_CLICKAWAY: &str = "data-popover-disable-clickaway";
    /// `true` disables escape dismissal.
    pub const DISABLE_ESC: &str = "data-popover-disable-esc";
    /// `true` exposes the trigger width to the content.
    pub const MATCH_WIDTH: &str = "data-popover-match-width";
    /// Exclusive family of the content.
    pub const FAMILY: &str = "data-popover-family";
    /// Marks the arrow element inside content.
    pub const ARROW: &str = "data-popover-arrow";
    /// Marks the shared portal container.
    pub const PORTAL: &str = "data-popover-portal-container";
    /// Open state written onto content (`open`, `closing`, `closed`).
    pub const STATE: &str = "data-state";
    /// Final placement written onto content.
    pub const SIDE: &str = "data-side";
    /// Open state written onto triggers.
    pub const EXPANDED: &str = "aria-expanded";
}

/// Style property carrying the trigger width when `data-popover-match-width` is set.
pub const TRIGGER_WIDTH_PROPERTY: &str = "--popover-trigger-width";

/// Bounded retry used while the geometry engine is not installed yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 40,
            interval: Duration::from_millis(50),
        }
    }
}

/// Context-wide settings.
#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// Box of the document root; the portal container covers it.
    pub viewport: Rect,
    /// Hover open delay when content does not set one.
    pub open_delay: Duration,
    /// Hover close delay when content does not set one.
    pub close_delay: Duration,
    /// Length of the exit transition before content is hidden.
    pub exit_duration: Duration,
    /// Retry policy for bind passes issued before the engine is installed.
    pub engine_retry: RetryPolicy,
    /// Family used when content does not name one.
    pub default_family: String,
    /// Offset when content has an arrow and sets no offset.
    pub arrow_offset: f64,
    /// Offset when content has no arrow and sets no offset.
    pub plain_offset: f64,
    /// Padding passed to the flip step.
    pub flip_padding: f64,
    /// Padding passed to the shift step.
    pub shift_padding: f64,
    /// Padding passed to the arrow step.
    pub arrow_padding: f64,
    /// Inset of the arrow's static side.
    pub arrow_inset: f64,
    /// Stacking order of the portal container.
    pub portal_z_index: i32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            viewport: Rect::new(0.0, 0.0, 1280.0, 800.0),
            open_delay: Duration::from_millis(100),
            close_delay: Duration::from_millis(200),
            exit_duration: Duration::from_millis(150),
            engine_retry: RetryPolicy::default(),
            default_family: "popover".into(),
            arrow_offset: 8.0,
            plain_offset: 4.0,
            flip_padding: 10.0,
            shift_padding: 10.0,
            arrow_padding: 5.0,
            arrow_inset: -5.0,
            portal_z_index: 9999,
        }
    }
}

/// Per-overlay settings, read from the content element's attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    /// Preferred placement.
    pub placement: Placement,
    /// Distance between trigger and content.
    pub offset: f64,
    /// Hover open delay.
    pub open_delay: Duration,
    /// Hover close delay.
    pub close_delay: Duration,
    /// Whether an outside click dismisses the overlay.
    pub click_away: bool,
    /// Whether the escape key dismisses the overlay.
    pub escape: bool,
    /// Whether the trigger width is exposed to the content.
    pub match_width: bool,
    /// Exclusive family.
    pub family: Family,
}

impl OverlayConfig {
    /// Defaults for content without configuration attributes.
    pub fn defaults(config: &ContextConfig) -> Self {
        Self {
            placement: Placement::default(),
            offset: config.plain_offset,
            open_delay: config.open_delay,
            close_delay: config.close_delay,
            click_away: true,
            escape: true,
            match_width: false,
            family: Family::new(&config.default_family),
        }
    }

    /// Read the settings of `content`, falling back to defaults field by field.
    pub fn from_element(tree: &Tree, content: NodeId, config: &ContextConfig) -> Self {
        let mut out = Self::defaults(config);
        let has_arrow = tree
            .find_first(content, |t, n| n != content && t.has_attr(n, attr::ARROW))
            .is_some();
        if has_arrow {
            out.offset = config.arrow_offset;
        }
        if let Some(raw) = tree.attr(content, attr::PLACEMENT) {
            match raw.parse() {
                Ok(p) => out.placement = p,
                Err(err) => tracing::debug!(%err, "ignoring placement attribute"),
            }
        }
        if let Some(offset) = number(tree, content, attr::OFFSET) {
            out.offset = offset;
        }
        if let Some(ms) = millis(tree, content, attr::HOVER_DELAY) {
            out.open_delay = ms;
        }
        if let Some(ms) = millis(tree, content, attr::HOVER_OUT_DELAY) {
            out.close_delay = ms;
        }
        out.click_away = !flag(tree, content, attr::DISABLE_CLICKAWAY);
        out.escape = !flag(tree, content, attr::DISABLE_ESC);
        out.match_width = flag(tree, content, attr::MATCH_WIDTH);
        if let Some(family) = tree.attr(content, attr::FAMILY).filter(|f| !f.is_empty()) {
            out.family = Family::new(family);
        }
        out
    }
}

fn flag(tree: &Tree, node: NodeId, name: &str) -> bool {
    tree.attr(node, name) == Some("true")
}

fn number(tree: &Tree, node: NodeId, name: &str) -> Option<f64> {
    let raw = tree.attr(node, name)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::debug!(attribute = name, value = raw, "ignoring non-numeric attribute");
            None
        }
    }
}

fn millis(tree: &Tree, node: NodeId, name: &str) -> Option<Duration> {
    let raw = tree.attr(node, name)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::debug!(attribute = name, value = raw, "ignoring non-integer delay");
            None
        }
    }
}
