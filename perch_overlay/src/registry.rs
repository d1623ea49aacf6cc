// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay registry: one lifecycle state per identity.

use std::collections::HashMap;

use perch_tree::NodeId;

use crate::config::OverlayConfig;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::subscription::{Subscription, SubscriptionLedger};
use crate::types::{Family, OverlayIdentity};

/// Externally observable lifecycle phase.
///
/// `Opening` is not represented: opening runs synchronously inside one call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Hidden.
    #[default]
    Closed,
    /// Visible and tracking its reference.
    Open,
    /// Dismissed, still visible until the exit transition ends.
    Closing,
}

/// Pending hover-intent timers. At most one per direction.
#[derive(Debug, Default)]
pub(crate) struct HoverTimers {
    pub(crate) open: Option<TaskHandle>,
    pub(crate) close: Option<TaskHandle>,
}

/// Lifecycle state of one overlay.
#[derive(Debug)]
pub struct OverlayState {
    pub(crate) trigger: NodeId,
    pub(crate) content: NodeId,
    pub(crate) config: OverlayConfig,
    pub(crate) phase: LifecyclePhase,
    pub(crate) position: Option<Subscription>,
    pub(crate) click_away: Option<Subscription>,
    pub(crate) escape: Option<Subscription>,
    /// Deferred attachment of `click_away`.
    pub(crate) arm: Option<TaskHandle>,
    pub(crate) hover: HoverTimers,
    pub(crate) exit: Option<TaskHandle>,
}

impl OverlayState {
    fn new(trigger: NodeId, content: NodeId, config: OverlayConfig) -> Self {
        Self {
            trigger,
            content,
            config,
            phase: LifecyclePhase::Closed,
            position: None,
            click_away: None,
            escape: None,
            arm: None,
            hover: HoverTimers::default(),
            exit: None,
        }
    }

    /// Most recently bound trigger element.
    pub fn trigger(&self) -> NodeId {
        self.trigger
    }

    /// Content element.
    pub fn content(&self) -> NodeId {
        self.content
    }

    /// Settings in effect.
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Returns true while open. `Closing` counts as closed.
    pub fn is_open(&self) -> bool {
        self.phase == LifecyclePhase::Open
    }

    /// Returns true if the per-frame position subscription is live.
    pub fn is_tracking(&self) -> bool {
        self.position.is_some()
    }

    /// Returns true if the outside-click listener is attached.
    pub fn listens_for_click_away(&self) -> bool {
        self.click_away.is_some()
    }

    /// Returns true if the escape listener is attached.
    pub fn listens_for_escape(&self) -> bool {
        self.escape.is_some()
    }

    /// Pending timers that a close cancels (hover open/close and dismissal arming).
    pub fn pending_timers(&self) -> usize {
        [self.arm, self.hover.open, self.hover.close]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }

    /// Cancel every open-scoped subscription and every pending timer except the exit.
    ///
    /// Each handle is taken out of its slot before it is disposed, so calling this again
    /// (or from inside a disposer) does nothing.
    pub(crate) fn release_open_scoped<T>(
        &mut self,
        ledger: &mut SubscriptionLedger,
        scheduler: &mut Scheduler<T>,
    ) {
        ledger.release(&mut self.position);
        ledger.release(&mut self.click_away);
        ledger.release(&mut self.escape);
        scheduler.cancel_slot(&mut self.arm);
        scheduler.cancel_slot(&mut self.hover.open);
        scheduler.cancel_slot(&mut self.hover.close);
    }

    /// Release everything the state owns, including a pending exit transition.
    pub(crate) fn dispose<T>(mut self, ledger: &mut SubscriptionLedger, scheduler: &mut Scheduler<T>) {
        self.release_open_scoped(ledger, scheduler);
        scheduler.cancel_slot(&mut self.exit);
    }
}

/// Outcome of [`OverlayRegistry::ensure`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ensured {
    /// A fresh state was created.
    Created,
    /// Trigger/content references were refreshed; the phase was kept.
    Refreshed,
    /// The identity now points at a different content element; the state was reset.
    Superseded,
}

/// Map from identity to lifecycle state.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    states: HashMap<OverlayIdentity, OverlayState>,
}

impl OverlayRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `id`.
    pub fn get(&self, id: &OverlayIdentity) -> Option<&OverlayState> {
        self.states.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &OverlayIdentity) -> Option<&mut OverlayState> {
        self.states.get_mut(id)
    }

    /// Returns true if `id` has a state.
    pub fn contains(&self, id: &OverlayIdentity) -> bool {
        self.states.contains_key(id)
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if there are no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Identities with a state.
    pub fn identities(&self) -> impl Iterator<Item = &OverlayIdentity> {
        self.states.keys()
    }

    /// Iterate all states.
    pub fn iter(&self) -> impl Iterator<Item = (&OverlayIdentity, &OverlayState)> {
        self.states.iter()
    }

    /// Create the state of `id`, or refresh its element references.
    ///
    /// Switching to a different content element resets the state to closed. Callers
    /// close the previous overlay before superseding it, so there is nothing left to
    /// release here.
    pub(crate) fn ensure(
        &mut self,
        id: &OverlayIdentity,
        trigger: NodeId,
        content: NodeId,
        config: OverlayConfig,
    ) -> Ensured {
        match self.states.get_mut(id) {
            None => {
                self.states
                    .insert(id.clone(), OverlayState::new(trigger, content, config));
                Ensured::Created
            }
            Some(state) if state.content != content => {
                debug_assert!(
                    state.position.is_none() && state.click_away.is_none() && state.escape.is_none(),
                    "superseded overlay must be closed first"
                );
                *state = OverlayState::new(trigger, content, config);
                Ensured::Superseded
            }
            Some(state) => {
                state.trigger = trigger;
                state.config = config;
                Ensured::Refreshed
            }
        }
    }

    /// Remove and return the state of `id`.
    pub(crate) fn remove(&mut self, id: &OverlayIdentity) -> Option<OverlayState> {
        self.states.remove(id)
    }

    /// Identities in `family` that are open or closing, other than `except`.
    pub(crate) fn active_in_family(
        &self,
        family: &Family,
        except: &OverlayIdentity,
    ) -> Vec<OverlayIdentity> {
        let mut out: Vec<_> = self
            .states
            .iter()
            .filter(|(id, s)| {
                *id != except && s.phase != LifecyclePhase::Closed && &s.config.family == family
            })
            .map(|(id, _)| id.clone())
            .collect();
        out.sort();
        out
    }

    /// Identities whose open state has the given listener attached.
    pub(crate) fn listening(&self, pick: impl Fn(&OverlayState) -> bool) -> Vec<OverlayIdentity> {
        let mut out: Vec<_> = self
            .states
            .iter()
            .filter(|(_, s)| pick(s))
            .map(|(id, _)| id.clone())
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::subscription::SubscriptionKind;
    use perch_tree::{LocalNode, Tree};

    fn nodes() -> (NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let a = tree.insert(None, LocalNode::default());
        let b = tree.insert(None, LocalNode::default());
        let c = tree.insert(None, LocalNode::default());
        (a, b, c)
    }

    fn cfg() -> OverlayConfig {
        OverlayConfig::defaults(&ContextConfig::default())
    }

    #[test]
    fn ensure_creates_then_refreshes() {
        let (trigger, content, other_trigger) = nodes();
        let mut reg = OverlayRegistry::new();
        let id = OverlayIdentity::from("menu1");
        assert_eq!(reg.ensure(&id, trigger, content, cfg()), Ensured::Created);
        reg.get_mut(&id).unwrap().phase = LifecyclePhase::Open;
        assert_eq!(
            reg.ensure(&id, other_trigger, content, cfg()),
            Ensured::Refreshed
        );
        let state = reg.get(&id).unwrap();
        assert_eq!(state.trigger(), other_trigger, "most recent trigger wins");
        assert!(state.is_open(), "refresh keeps the phase");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn ensure_with_new_content_supersedes() {
        let (trigger, content, new_content) = nodes();
        let mut reg = OverlayRegistry::new();
        let id = OverlayIdentity::from("menu1");
        reg.ensure(&id, trigger, content, cfg());
        assert_eq!(
            reg.ensure(&id, trigger, new_content, cfg()),
            Ensured::Superseded
        );
        assert_eq!(reg.get(&id).unwrap().content(), new_content);
        assert_eq!(reg.get(&id).unwrap().phase(), LifecyclePhase::Closed);
    }

    #[test]
    fn dispose_releases_everything_once() {
        let (trigger, content, _) = nodes();
        let mut reg = OverlayRegistry::new();
        let mut ledger = SubscriptionLedger::new();
        let mut scheduler: Scheduler<()> = Scheduler::new();
        let id = OverlayIdentity::from("menu1");
        reg.ensure(&id, trigger, content, cfg());
        {
            let s = reg.get_mut(&id).unwrap();
            s.position = Some(ledger.attach(&id, SubscriptionKind::Position));
            s.escape = Some(ledger.attach(&id, SubscriptionKind::Escape));
            s.arm = Some(scheduler.schedule(std::time::Duration::ZERO, ()));
            s.exit = Some(scheduler.schedule(std::time::Duration::from_millis(150), ()));
            assert_eq!(s.pending_timers(), 1);
        }
        let state = reg.remove(&id).unwrap();
        state.dispose(&mut ledger, &mut scheduler);
        assert!(ledger.is_empty());
        assert!(scheduler.is_empty());
        assert!(reg.remove(&id).is_none());
    }

    #[test]
    fn family_lookup_skips_closed_and_self() {
        let (t, c1, c2) = nodes();
        let mut reg = OverlayRegistry::new();
        let a = OverlayIdentity::from("a");
        let b = OverlayIdentity::from("b");
        reg.ensure(&a, t, c1, cfg());
        reg.ensure(&b, t, c2, cfg());
        let family = cfg().family;
        assert!(reg.active_in_family(&family, &b).is_empty());
        reg.get_mut(&a).unwrap().phase = LifecyclePhase::Closing;
        assert_eq!(reg.active_in_family(&family, &b), vec![a.clone()]);
        assert!(reg.active_in_family(&family, &a).is_empty());
    }
}
