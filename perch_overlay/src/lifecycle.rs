// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Open/close transitions and per-frame placement.

use std::time::Duration;

use kurbo::Affine;
use perch_tree::{NodeId, Tree};

use crate::config::{OverlayConfig, TRIGGER_WIDTH_PROPERTY, attr};
use crate::context::{OverlayContext, Task};
use crate::error::OverlayError;
use crate::geometry::{ArrowStyle, GeometryError, Middleware, PositionRequest, px};
use crate::registry::{LifecyclePhase, OverlayState};
use crate::scheduler::TaskHandle;
use crate::subscription::SubscriptionKind;
use crate::types::OverlayIdentity;

impl OverlayContext {
    /// Open overlay `id`. Returns true if it transitioned to open.
    ///
    /// Failures (unknown identity, missing elements, no engine, another transition
    /// in flight) are logged and leave the overlay as it was.
    pub fn open_overlay(&mut self, id: &str) -> bool {
        let id = OverlayIdentity::new(id);
        self.guarded(&id, |cx| cx.try_open(&id))
    }

    /// Close overlay `id`, immediately or through the exit transition.
    ///
    /// Returns true if the overlay was open (or closing, for an immediate close).
    pub fn close_overlay(&mut self, id: &str, immediate: bool) -> bool {
        let id = OverlayIdentity::new(id);
        self.guarded(&id, |cx| cx.try_close(&id, immediate))
    }

    /// Open overlay `id` if it is not open, otherwise close it. Returns the new open state.
    pub fn toggle_overlay(&mut self, id: &str) -> bool {
        if self.is_open(id) {
            self.close_overlay(id, false);
        } else {
            self.open_overlay(id);
        }
        self.is_open(id)
    }

    /// Press activation: toggle on behalf of `trigger`.
    pub(crate) fn toggle_from(&mut self, trigger: NodeId, id: &OverlayIdentity) {
        if self.registry.get(id).is_some_and(OverlayState::is_open) {
            self.guarded(id, |cx| cx.try_close(id, false));
        } else {
            self.open_from(trigger, id);
        }
    }

    /// Open `id` with `trigger` as its reference.
    pub(crate) fn open_from(&mut self, trigger: NodeId, id: &OverlayIdentity) -> bool {
        self.guarded(id, |cx| {
            cx.retarget(id, trigger);
            cx.try_open(id)
        })
    }

    /// Point the state of `id` at `trigger`, recreating the state if a teardown
    /// removed it while the trigger stayed bound.
    fn retarget(&mut self, id: &OverlayIdentity, trigger: NodeId) {
        if !self.tree.is_alive(trigger) {
            return;
        }
        if let Some(state) = self.registry.get_mut(id) {
            state.trigger = trigger;
            return;
        }
        let Some(content) = self
            .tree
            .find_by_attr(self.document, attr::CONTENT_ID, id.as_str())
        else {
            return;
        };
        let config = OverlayConfig::from_element(&self.tree, content, &self.config);
        self.registry.ensure(id, trigger, content, config);
        tracing::debug!(overlay = %id, "recreated state on activation");
    }

    /// Run one transition, refusing to start while another is unfinished.
    fn guarded(
        &mut self,
        id: &OverlayIdentity,
        step: impl FnOnce(&mut Self) -> Result<bool, OverlayError>,
    ) -> bool {
        if let Some(pending) = &self.in_flight {
            report(&OverlayError::TransitionInFlight {
                requested: id.clone(),
                pending: pending.clone(),
            });
            return false;
        }
        self.in_flight = Some(id.clone());
        let result = step(self);
        self.in_flight = None;
        result.unwrap_or_else(|err| {
            report(&err);
            false
        })
    }

    pub(crate) fn try_open(&mut self, id: &OverlayIdentity) -> Result<bool, OverlayError> {
        if self.engine.is_none() {
            return Err(OverlayError::EngineUnavailable);
        }
        let state = self
            .registry
            .get(id)
            .ok_or_else(|| OverlayError::UnknownOverlay(id.clone()))?;
        if state.is_open() {
            return Ok(false);
        }
        let (trigger, content) = (state.trigger, state.content);
        if !self.tree.is_alive(content) {
            return Err(missing(id, "content"));
        }
        if !self.tree.is_alive(trigger) {
            return Err(missing(id, "trigger"));
        }
        let config = OverlayConfig::from_element(&self.tree, content, &self.config);

        // Siblings in the family finish their cleanup before this one starts.
        for other in self.registry.active_in_family(&config.family, id) {
            tracing::debug!(overlay = %other, replaced_by = %id, "closing exclusive sibling");
            self.try_close(&other, true)?;
        }

        {
            let Self {
                registry,
                ledger,
                scheduler,
                ..
            } = self;
            let state = registry
                .get_mut(id)
                .ok_or_else(|| OverlayError::UnknownOverlay(id.clone()))?;
            state.release_open_scoped(ledger, scheduler);
            scheduler.cancel_slot(&mut state.exit);
            state.config = config;
        }

        self.tree.set_visible(content, true);
        self.portal
            .attach(&mut self.tree, self.document, content, self.config.portal_z_index);
        self.tree.set_attr(content, attr::STATE, "open");
        self.tree.set_attr(trigger, attr::EXPANDED, "true");
        if let Err(err) = self.update_position(id) {
            tracing::debug!(overlay = %id, %err, "initial placement failed");
        }

        let Self {
            registry,
            ledger,
            scheduler,
            ..
        } = self;
        let state = registry
            .get_mut(id)
            .ok_or_else(|| OverlayError::UnknownOverlay(id.clone()))?;
        state.position = Some(ledger.attach(id, SubscriptionKind::Position));
        if state.config.escape {
            state.escape = Some(ledger.attach(id, SubscriptionKind::Escape));
        }
        if state.config.click_away {
            // The click that opened the overlay is still propagating.
            state.arm = Some(scheduler.schedule(Duration::ZERO, Task::ArmClickAway(id.clone())));
        }
        state.phase = LifecyclePhase::Open;
        tracing::debug!(overlay = %id, "opened");
        Ok(true)
    }

    pub(crate) fn try_close(
        &mut self,
        id: &OverlayIdentity,
        immediate: bool,
    ) -> Result<bool, OverlayError> {
        let Self {
            tree,
            registry,
            ledger,
            scheduler,
            config,
            ..
        } = self;
        let state = registry
            .get_mut(id)
            .ok_or_else(|| OverlayError::UnknownOverlay(id.clone()))?;
        match state.phase {
            LifecyclePhase::Closed => {
                state.release_open_scoped(ledger, scheduler);
                return Ok(false);
            }
            LifecyclePhase::Closing if !immediate => return Ok(false),
            LifecyclePhase::Closing | LifecyclePhase::Open => {}
        }
        state.release_open_scoped(ledger, scheduler);
        tree.set_attr(state.trigger, attr::EXPANDED, "false");
        if immediate {
            scheduler.cancel_slot(&mut state.exit);
            hide(tree, state);
        } else {
            state.phase = LifecyclePhase::Closing;
            tree.set_attr(state.content, attr::STATE, "closing");
            state.exit = Some(scheduler.schedule(config.exit_duration, Task::FinishExit(id.clone())));
        }
        tracing::debug!(overlay = %id, immediate, "closed");
        Ok(true)
    }

    pub(crate) fn finish_exit(&mut self, id: &OverlayIdentity, handle: TaskHandle) {
        let Some(state) = self.registry.get_mut(id) else {
            return;
        };
        if state.exit != Some(handle) {
            return;
        }
        state.exit = None;
        if state.phase == LifecyclePhase::Closing {
            hide(&mut self.tree, state);
            tracing::trace!(overlay = %id, "exit transition finished");
        }
    }

    pub(crate) fn arm_click_away(&mut self, id: &OverlayIdentity, handle: TaskHandle) {
        let Self {
            registry, ledger, ..
        } = self;
        let Some(state) = registry.get_mut(id) else {
            return;
        };
        if state.arm != Some(handle) {
            return;
        }
        state.arm = None;
        if state.is_open() && state.config.click_away {
            state.click_away = Some(ledger.attach(id, SubscriptionKind::ClickAway));
        }
    }

    /// Recompute the position of overlay `id` and write it onto the content.
    pub(crate) fn update_position(&mut self, id: &OverlayIdentity) -> Result<(), OverlayError> {
        let engine = self
            .engine
            .as_deref()
            .ok_or(OverlayError::EngineUnavailable)?;
        let state = self
            .registry
            .get(id)
            .ok_or_else(|| OverlayError::UnknownOverlay(id.clone()))?;
        let (trigger, content) = (state.trigger, state.content);
        let reference = find_reference_element(&self.tree, trigger);
        let reference_box = self
            .tree
            .world_bounds(reference)
            .ok_or(GeometryError::MissingReference)?;
        let content_box = self
            .tree
            .local_bounds(content)
            .ok_or_else(|| missing(id, "content"))?;
        let arrow = self
            .tree
            .find_first(content, |t, n| n != content && t.has_attr(n, attr::ARROW));

        let mut middleware = vec![
            Middleware::Offset(state.config.offset),
            Middleware::Flip {
                padding: self.config.flip_padding,
            },
            Middleware::Shift {
                padding: self.config.shift_padding,
            },
        ];
        if let Some(arrow) = arrow {
            middleware.push(Middleware::Arrow {
                size: self.tree.local_bounds(arrow).unwrap_or_default().size(),
                padding: self.config.arrow_padding,
            });
        }
        let request = PositionRequest {
            reference: reference_box,
            floating: content_box.size(),
            placement: state.config.placement,
            middleware,
        };
        let match_width = state.config.match_width;
        let computed = engine.compute_position(&request)?;

        let parent = self
            .tree
            .parent(content)
            .and_then(|p| self.tree.world_transform(p))
            .unwrap_or(Affine::IDENTITY);
        let delta = computed.origin - content_box.origin();
        self.tree
            .set_local_transform(content, parent.inverse() * Affine::translate(delta));
        self.tree
            .set_style(content, "left", Some(&px(computed.origin.x)));
        self.tree
            .set_style(content, "top", Some(&px(computed.origin.y)));
        self.tree
            .set_attr(content, attr::SIDE, computed.placement.side.as_str());
        if match_width {
            self.tree.set_style(
                content,
                TRIGGER_WIDTH_PROPERTY,
                Some(&px(reference_box.width())),
            );
        }
        if let (Some(arrow), Some(data)) = (arrow, computed.arrow) {
            ArrowStyle::new(computed.placement, data).apply(
                &mut self.tree,
                arrow,
                self.config.arrow_inset,
            );
        }
        Ok(())
    }
}

fn hide(tree: &mut Tree, state: &mut OverlayState) {
    tree.set_visible(state.content, false);
    tree.set_attr(state.content, attr::STATE, "closed");
    state.phase = LifecyclePhase::Closed;
}

fn missing(id: &OverlayIdentity, role: &'static str) -> OverlayError {
    OverlayError::MissingElement {
        identity: id.clone(),
        role,
    }
}

fn report(err: &OverlayError) {
    match err {
        OverlayError::TransitionInFlight { .. } | OverlayError::Geometry(_) => {
            tracing::warn!(%err, "overlay transition rejected");
        }
        OverlayError::UnknownOverlay(_)
        | OverlayError::MissingElement { .. }
        | OverlayError::EngineUnavailable => {
            tracing::debug!(%err, "overlay transition skipped");
        }
    }
}

/// The element the content is positioned against: the trigger's largest child by
/// area, or the trigger itself when it has no child with a box.
pub(crate) fn find_reference_element(tree: &Tree, trigger: NodeId) -> NodeId {
    let mut best = trigger;
    let mut largest = 0.0;
    for &child in tree.children(trigger) {
        let area = tree.world_bounds(child).map_or(0.0, |r| r.area());
        if area > largest {
            largest = area;
            best = child;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use perch_tree::LocalNode;

    #[test]
    fn reference_is_largest_child() {
        let mut tree = Tree::new();
        let trigger = tree.insert(None, LocalNode::with_bounds(Rect::new(0.0, 0.0, 100.0, 40.0)));
        let _icon = tree.insert(
            Some(trigger),
            LocalNode::with_bounds(Rect::new(0.0, 0.0, 16.0, 16.0)),
        );
        let button = tree.insert(
            Some(trigger),
            LocalNode::with_bounds(Rect::new(20.0, 0.0, 90.0, 40.0)),
        );
        assert_eq!(find_reference_element(&tree, trigger), button);
    }

    #[test]
    fn childless_trigger_is_its_own_reference() {
        let mut tree = Tree::new();
        let trigger = tree.insert(None, LocalNode::with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let _empty = tree.insert(Some(trigger), LocalNode::default());
        assert_eq!(find_reference_element(&tree, trigger), trigger);
    }
}
