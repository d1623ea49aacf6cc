// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed subscription tokens and the ledger that issues them.
//!
//! Every listener the coordinator attaches (position updates, dismissal listeners,
//! element handlers) is represented by a [`Subscription`] owned by whoever attached it.
//! Tokens cannot be cloned and [`SubscriptionLedger::detach`] consumes them, so a
//! listener cannot be detached twice through the same token. Owners keep tokens in
//! `Option` slots and detach through [`SubscriptionLedger::release`], which takes the
//! token out of the slot before disposing of it.

use std::collections::HashMap;

use crate::types::OverlayIdentity;

/// What a subscription listens for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Per-frame re-positioning while open.
    Position,
    /// Document-level outside-click listener.
    ClickAway,
    /// Document-level escape-key listener.
    Escape,
    /// Press handler on a trigger.
    Activation,
    /// Pointer enter/leave handler on a hover trigger.
    HoverTrigger,
    /// Pointer enter/leave handler on hover content.
    HoverContent,
}

impl SubscriptionKind {
    /// Returns true for subscriptions that only exist while an overlay is open.
    pub const fn is_open_scoped(self) -> bool {
        matches!(self, Self::Position | Self::ClickAway | Self::Escape)
    }
}

/// Owning handle to a live subscription.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a subscription leaks it; pass it to `SubscriptionLedger::detach`"]
pub struct Subscription {
    key: u64,
    kind: SubscriptionKind,
}

impl Subscription {
    /// What this subscription listens for.
    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }
}

/// Issues subscriptions and tracks which are live, per overlay identity.
#[derive(Debug, Default)]
pub struct SubscriptionLedger {
    next: u64,
    live: HashMap<u64, (OverlayIdentity, SubscriptionKind)>,
}

impl SubscriptionLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscription on behalf of `owner`.
    pub fn attach(&mut self, owner: &OverlayIdentity, kind: SubscriptionKind) -> Subscription {
        let key = self.next;
        self.next += 1;
        self.live.insert(key, (owner.clone(), kind));
        Subscription { key, kind }
    }

    /// Detach a subscription. Returns `false` if the ledger had already dropped it.
    pub fn detach(&mut self, sub: Subscription) -> bool {
        self.live.remove(&sub.key).is_some()
    }

    /// Detach the subscription in `slot`, if any, leaving `None` behind.
    pub fn release(&mut self, slot: &mut Option<Subscription>) -> bool {
        slot.take().is_some_and(|sub| self.detach(sub))
    }

    /// Detach every subscription in `subs`.
    pub fn release_all(&mut self, subs: &mut Vec<Subscription>) {
        for sub in subs.drain(..) {
            self.detach(sub);
        }
    }

    /// Returns true if the subscription is still live.
    pub fn is_live(&self, sub: &Subscription) -> bool {
        self.live.contains_key(&sub.key)
    }

    /// Live subscriptions of `kind` owned by `owner`.
    pub fn count(&self, owner: &OverlayIdentity, kind: SubscriptionKind) -> usize {
        self.live
            .values()
            .filter(|(o, k)| o == owner && *k == kind)
            .count()
    }

    /// Live open-scoped subscriptions owned by `owner`.
    pub fn open_scoped(&self, owner: &OverlayIdentity) -> usize {
        self.live
            .values()
            .filter(|(o, k)| o == owner && k.is_open_scoped())
            .count()
    }

    /// Total live subscriptions.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if nothing is live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_takes_token_and_is_idempotent() {
        let mut ledger = SubscriptionLedger::new();
        let id = OverlayIdentity::from("menu");
        let mut slot = Some(ledger.attach(&id, SubscriptionKind::Position));
        assert_eq!(ledger.open_scoped(&id), 1);
        assert!(ledger.release(&mut slot));
        assert!(slot.is_none());
        assert!(!ledger.release(&mut slot), "second release is a no-op");
        assert!(ledger.is_empty());
    }

    #[test]
    fn counts_are_per_owner_and_kind() {
        let mut ledger = SubscriptionLedger::new();
        let a = OverlayIdentity::from("a");
        let b = OverlayIdentity::from("b");
        let press = ledger.attach(&a, SubscriptionKind::Activation);
        let esc = ledger.attach(&a, SubscriptionKind::Escape);
        let _other = ledger.attach(&b, SubscriptionKind::Escape);
        assert_eq!(ledger.count(&a, SubscriptionKind::Activation), 1);
        assert_eq!(ledger.open_scoped(&a), 1, "handlers are not open-scoped");
        assert!(ledger.is_live(&press));
        assert!(ledger.detach(esc));
        assert_eq!(ledger.open_scoped(&a), 0);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.detach(press));
    }

    #[test]
    fn release_all_drains() {
        let mut ledger = SubscriptionLedger::new();
        let a = OverlayIdentity::from("a");
        let mut subs = vec![
            ledger.attach(&a, SubscriptionKind::HoverTrigger),
            ledger.attach(&a, SubscriptionKind::HoverTrigger),
        ];
        ledger.release_all(&mut subs);
        assert!(subs.is_empty());
        assert_eq!(ledger.count(&a, SubscriptionKind::HoverTrigger), 0);
    }
}
