// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trigger discovery and activation handlers.
//!
//! A bind pass walks a subtree for elements carrying `data-popover-trigger`, resolves
//! the content they name, and attaches the handlers for their activation mode. Passes
//! are idempotent: re-binding a trigger with the same identity and mode attaches nothing.

use std::collections::HashMap;

use perch_tree::NodeId;

use crate::config::{OverlayConfig, attr};
use crate::context::{OverlayContext, Task};
use crate::hover::HoverTransition;
use crate::registry::{LifecyclePhase, OverlayState};
use crate::subscription::{Subscription, SubscriptionKind};
use crate::types::{ActivationMode, OverlayIdentity};
use crate::widgets;

#[derive(Debug)]
pub(crate) struct TriggerBinding {
    pub(crate) identity: OverlayIdentity,
    pub(crate) mode: ActivationMode,
    handlers: Vec<Subscription>,
}

#[derive(Debug)]
pub(crate) struct ContentBinding {
    pub(crate) identity: OverlayIdentity,
    handlers: Vec<Subscription>,
}

/// Handlers attached to trigger and content elements.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    pub(crate) triggers: HashMap<NodeId, TriggerBinding>,
    pub(crate) contents: HashMap<NodeId, ContentBinding>,
}

impl OverlayContext {
    /// Bind every trigger under `root`. Returns the number of triggers that gained handlers.
    ///
    /// Without an engine, the pass is retried on a fixed interval and abandoned with an
    /// error log once the retry budget is spent.
    pub fn bind(&mut self, root: NodeId) -> usize {
        if self.engine.is_none() {
            self.retry_bind_later(root, 1);
            return 0;
        }
        self.bind_pass(root)
    }

    /// Number of triggers with attached handlers.
    pub fn bound_triggers(&self) -> usize {
        self.bindings.triggers.len()
    }

    pub(crate) fn retry_bind(&mut self, root: NodeId, attempt: u32) {
        if !self.tree.is_alive(root) {
            tracing::trace!(?root, "bind root removed before the engine arrived");
            return;
        }
        if self.engine.is_some() {
            self.bind_pass(root);
        } else {
            self.retry_bind_later(root, attempt);
        }
    }

    fn retry_bind_later(&mut self, root: NodeId, attempt: u32) {
        let policy = self.config.engine_retry;
        if attempt >= policy.attempts {
            tracing::error!(attempts = attempt, "geometry engine never became available; triggers left unbound");
            return;
        }
        tracing::trace!(attempt, "geometry engine not installed; retrying bind");
        self.scheduler.schedule(
            policy.interval,
            Task::RetryBind {
                root,
                attempt: attempt + 1,
            },
        );
    }

    fn bind_pass(&mut self, root: NodeId) -> usize {
        let triggers: Vec<NodeId> = self
            .tree
            .descendants(root)
            .into_iter()
            .filter(|&n| self.tree.has_attr(n, attr::TRIGGER))
            .collect();
        let bound = triggers
            .iter()
            .filter(|&&trigger| self.bind_trigger(trigger))
            .count();
        widgets::sync_selects(self, root);
        tracing::debug!(?root, found = triggers.len(), bound, "bind pass");
        bound
    }

    /// Attach handlers to one trigger. Returns true if handlers were attached.
    fn bind_trigger(&mut self, trigger: NodeId) -> bool {
        let Some(raw) = self.tree.attr(trigger, attr::FOR).filter(|s| !s.is_empty()) else {
            tracing::trace!(?trigger, "trigger names no overlay");
            return false;
        };
        let id = OverlayIdentity::new(raw);
        let Some(content) = self
            .tree
            .find_by_attr(self.document, attr::CONTENT_ID, id.as_str())
        else {
            tracing::trace!(overlay = %id, "content not rendered; trigger skipped");
            return false;
        };
        let Some(mode) = ActivationMode::from_attr(self.tree.attr(trigger, attr::TYPE)) else {
            tracing::debug!(overlay = %id, "unknown activation mode; trigger skipped");
            return false;
        };
        self.reconcile_state(&id, trigger, content);

        let unchanged = self
            .bindings
            .triggers
            .get(&trigger)
            .is_some_and(|b| b.identity == id && b.mode == mode);
        if mode == ActivationMode::Hover {
            self.bind_content(&id, content);
        }
        if unchanged {
            return false;
        }
        self.unbind_trigger(trigger);

        let handlers = match mode {
            ActivationMode::Press => vec![self.ledger.attach(&id, SubscriptionKind::Activation)],
            ActivationMode::Hover => vec![
                self.ledger.attach(&id, SubscriptionKind::HoverTrigger),
                self.ledger.attach(&id, SubscriptionKind::HoverTrigger),
            ],
        };
        let open = self.registry.get(&id).is_some_and(OverlayState::is_open);
        self.tree
            .set_attr(trigger, attr::EXPANDED, if open { "true" } else { "false" });
        self.bindings.triggers.insert(
            trigger,
            TriggerBinding {
                identity: id,
                mode,
                handlers,
            },
        );
        true
    }

    /// Create or refresh the state of `id`, superseding it when the content changed.
    fn reconcile_state(&mut self, id: &OverlayIdentity, trigger: NodeId, content: NodeId) {
        if let Some(previous) = self.registry.get(id).map(|s| s.content)
            && previous != content
        {
            tracing::debug!(overlay = %id, "content element replaced; superseding state");
            if let Err(err) = self.try_close(id, true) {
                tracing::debug!(overlay = %id, %err, "close before supersede failed");
            }
            self.unbind_content(previous);
        }
        let config = OverlayConfig::from_element(&self.tree, content, &self.config);
        let outcome = self.registry.ensure(id, trigger, content, config);
        tracing::trace!(overlay = %id, ?outcome, "registry entry ensured");
    }

    fn bind_content(&mut self, id: &OverlayIdentity, content: NodeId) {
        if self
            .bindings
            .contents
            .get(&content)
            .is_some_and(|b| &b.identity == id)
        {
            return;
        }
        self.unbind_content(content);
        let handlers = vec![
            self.ledger.attach(id, SubscriptionKind::HoverContent),
            self.ledger.attach(id, SubscriptionKind::HoverContent),
        ];
        self.bindings.contents.insert(
            content,
            ContentBinding {
                identity: id.clone(),
                handlers,
            },
        );
    }

    pub(crate) fn unbind_trigger(&mut self, trigger: NodeId) {
        if let Some(mut binding) = self.bindings.triggers.remove(&trigger) {
            self.ledger.release_all(&mut binding.handlers);
        }
    }

    pub(crate) fn unbind_content(&mut self, content: NodeId) {
        if let Some(mut binding) = self.bindings.contents.remove(&content) {
            self.ledger.release_all(&mut binding.handlers);
        }
    }

    /// Identity of the press trigger `node`, if it is one.
    pub(crate) fn press_identity(&self, node: NodeId) -> Option<OverlayIdentity> {
        self.bindings
            .triggers
            .get(&node)
            .filter(|b| b.mode == ActivationMode::Press)
            .map(|b| b.identity.clone())
    }

    // --- hover intent ---

    pub(crate) fn on_hover(&mut self, transition: HoverTransition<NodeId>) {
        match transition {
            HoverTransition::Enter { node, .. } => {
                if let Some(id) = self.hover_trigger_identity(node) {
                    self.hover_trigger_enter(&id, node);
                } else if let Some(id) = self.hover_content_identity(node) {
                    self.cancel_hover_close(&id);
                }
            }
            HoverTransition::Leave { node, related } => {
                if let Some(id) = self.hover_trigger_identity(node) {
                    self.hover_trigger_leave(&id, related);
                } else if let Some(id) = self.hover_content_identity(node) {
                    self.hover_content_leave(&id, related);
                }
            }
        }
    }

    fn hover_trigger_identity(&self, node: NodeId) -> Option<OverlayIdentity> {
        self.bindings
            .triggers
            .get(&node)
            .filter(|b| b.mode == ActivationMode::Hover)
            .map(|b| b.identity.clone())
    }

    fn hover_content_identity(&self, node: NodeId) -> Option<OverlayIdentity> {
        self.bindings.contents.get(&node).map(|b| b.identity.clone())
    }

    fn hover_trigger_enter(&mut self, id: &OverlayIdentity, trigger: NodeId) {
        let Self {
            registry,
            scheduler,
            ..
        } = self;
        let Some(state) = registry.get_mut(id) else {
            return;
        };
        scheduler.cancel_slot(&mut state.hover.close);
        scheduler.cancel_slot(&mut state.hover.open);
        let task = Task::HoverOpen {
            id: id.clone(),
            trigger,
        };
        state.hover.open = Some(scheduler.schedule(state.config.open_delay, task));
    }

    fn hover_trigger_leave(&mut self, id: &OverlayIdentity, related: Option<NodeId>) {
        let Some(state) = self.registry.get_mut(id) else {
            return;
        };
        self.scheduler.cancel_slot(&mut state.hover.open);
        let into_content = related.is_some_and(|r| self.tree.contains(state.content, r));
        if state.phase == LifecyclePhase::Open && !into_content {
            self.schedule_hover_close(id);
        }
    }

    fn hover_content_leave(&mut self, id: &OverlayIdentity, related: Option<NodeId>) {
        let Some(state) = self.registry.get(id) else {
            return;
        };
        let into_trigger = related.is_some_and(|r| self.tree.contains(state.trigger, r));
        if state.phase == LifecyclePhase::Open && !into_trigger {
            self.schedule_hover_close(id);
        }
    }

    fn cancel_hover_close(&mut self, id: &OverlayIdentity) {
        if let Some(state) = self.registry.get_mut(id) {
            self.scheduler.cancel_slot(&mut state.hover.close);
        }
    }

    fn schedule_hover_close(&mut self, id: &OverlayIdentity) {
        let Self {
            registry,
            scheduler,
            ..
        } = self;
        let Some(state) = registry.get_mut(id) else {
            return;
        };
        scheduler.cancel_slot(&mut state.hover.close);
        let delay = state.config.close_delay;
        state.hover.close = Some(scheduler.schedule(delay, Task::HoverClose(id.clone())));
    }
}
