// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dropdown menu items and select options living inside overlay content.
//!
//! A dropdown item closes the overlay around it once clicked, unless it opts out
//! with `data-prevent-close="true"` or opens a submenu. A select item records the
//! chosen value on its trigger, emits a [`SelectChange`] and closes the overlay.

use perch_tree::{NodeId, Tree};

use crate::config::attr as overlay_attr;
use crate::context::OverlayContext;
use crate::types::{OverlayIdentity, Outcome};

/// Attribute names used by menu and select markup.
pub mod attr {
    /// Marks a clickable dropdown entry.
    pub const DROPDOWN_ITEM: &str = "data-dropdown-item";
    /// Marks a dropdown entry that opens a nested menu instead of closing.
    pub const SUBMENU_TRIGGER: &str = "data-dropdown-submenu-trigger";
    /// `true` keeps the dropdown open after the item is clicked.
    pub const PREVENT_CLOSE: &str = "data-prevent-close";
    /// Marks a trigger as the face of a select.
    pub const SELECT_TRIGGER: &str = "data-select-trigger";
    /// Marks a selectable option.
    pub const SELECT_ITEM: &str = "data-select-item";
    /// Value of an option.
    pub const VALUE: &str = "data-value";
    /// Display label of an option.
    ///
    /// Markup that omits it gets the value as the label. The label is never read from
    /// the option's text content, so markup that wants a different label must set it.
    pub const LABEL: &str = "data-label";
    /// `true` on the chosen option.
    pub const SELECTED: &str = "data-selected";
    /// `true` on options that cannot be chosen.
    pub const DISABLED: &str = "data-disabled";
    /// Chosen value, written onto the select trigger.
    pub const SELECT_VALUE: &str = "data-select-value";
    /// Chosen label, written onto the select trigger.
    pub const SELECT_LABEL: &str = "data-select-label";
}

/// A value chosen in a select overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectChange {
    /// Overlay the option belongs to.
    pub identity: OverlayIdentity,
    /// Chosen value.
    pub value: String,
}

impl OverlayContext {
    /// Drain the select changes recorded since the last call.
    pub fn take_select_changes(&mut self) -> Vec<SelectChange> {
        std::mem::take(&mut self.select_changes)
    }
}

pub(crate) fn on_click(cx: &mut OverlayContext, node: NodeId) -> Outcome {
    let tree = &cx.tree;
    if tree.has_attr(node, attr::DROPDOWN_ITEM) && !tree.has_attr(node, attr::SUBMENU_TRIGGER) {
        dropdown_item(cx, node);
    } else if tree.has_attr(node, attr::SELECT_ITEM) {
        select_item(cx, node);
    }
    Outcome::Continue
}

/// Enter or Space on a focused element.
pub(crate) fn on_confirm_key(cx: &mut OverlayContext, node: NodeId) {
    if cx.tree.has_attr(node, attr::SELECT_ITEM) {
        select_item(cx, node);
    } else if cx.tree.has_attr(node, attr::DROPDOWN_ITEM) {
        cx.click(node);
    }
}

fn dropdown_item(cx: &mut OverlayContext, item: NodeId) {
    if cx.tree.attr(item, attr::PREVENT_CLOSE) == Some("true") {
        return;
    }
    match enclosing_overlay(&cx.tree, item) {
        Some((_, id)) => {
            cx.close_overlay(id.as_str(), true);
        }
        None => tracing::trace!(?item, "dropdown item outside any overlay"),
    }
}

fn select_item(cx: &mut OverlayContext, item: NodeId) {
    if cx.tree.attr(item, attr::DISABLED) == Some("true") {
        return;
    }
    let Some((content, id)) = enclosing_overlay(&cx.tree, item) else {
        tracing::trace!(?item, "select item outside any overlay");
        return;
    };
    let value = cx.tree.attr(item, attr::VALUE).unwrap_or_default().to_owned();
    let label = cx
        .tree
        .attr(item, attr::LABEL)
        .map_or_else(|| value.clone(), str::to_owned);

    for option in options(&cx.tree, content) {
        cx.tree.set_attr(option, attr::SELECTED, "false");
    }
    cx.tree.set_attr(item, attr::SELECTED, "true");
    if let Some(trigger) = cx.state(id.as_str()).map(|s| s.trigger()) {
        cx.tree.set_attr(trigger, attr::SELECT_VALUE, &value);
        cx.tree.set_attr(trigger, attr::SELECT_LABEL, &label);
    }
    tracing::debug!(overlay = %id, value = %value, "select value changed");
    cx.select_changes.push(SelectChange {
        identity: id.clone(),
        value,
    });
    cx.close_overlay(id.as_str(), true);
}

/// Copy the pre-selected option of every select under `root` onto its trigger.
pub(crate) fn sync_selects(cx: &mut OverlayContext, root: NodeId) {
    let selects: Vec<NodeId> = cx
        .tree
        .descendants(root)
        .into_iter()
        .filter(|&n| cx.tree.has_attr(n, attr::SELECT_TRIGGER))
        .collect();
    for trigger in selects {
        let Some(id) = cx.tree.attr(trigger, overlay_attr::FOR) else {
            continue;
        };
        let Some(content) = cx
            .tree
            .find_by_attr(cx.document, overlay_attr::CONTENT_ID, id)
        else {
            continue;
        };
        let Some(selected) = options(&cx.tree, content)
            .into_iter()
            .find(|&o| cx.tree.attr(o, attr::SELECTED) == Some("true"))
        else {
            continue;
        };
        let value = cx.tree.attr(selected, attr::VALUE).unwrap_or_default().to_owned();
        let label = cx
            .tree
            .attr(selected, attr::LABEL)
            .map_or_else(|| value.clone(), str::to_owned);
        cx.tree.set_attr(trigger, attr::SELECT_VALUE, &value);
        cx.tree.set_attr(trigger, attr::SELECT_LABEL, &label);
    }
}

fn options(tree: &Tree, content: NodeId) -> Vec<NodeId> {
    tree.descendants(content)
        .into_iter()
        .filter(|&n| tree.has_attr(n, attr::SELECT_ITEM))
        .collect()
}

/// The nearest ancestor carrying an overlay identity, with that identity.
fn enclosing_overlay(tree: &Tree, node: NodeId) -> Option<(NodeId, OverlayIdentity)> {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if let Some(id) = tree.attr(n, overlay_attr::CONTENT_ID) {
            return Some((n, OverlayIdentity::new(id)));
        }
        cur = tree.parent(n);
    }
    None
}
