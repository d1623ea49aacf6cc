// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-page overlay context: owns the document, the registry, and the clock.
//!
//! ## Driving the context
//!
//! The host forwards input with [`OverlayContext::click`], [`OverlayContext::pointer_move`]
//! and [`OverlayContext::key_down`] (or their point-based variants), advances time with
//! [`OverlayContext::advance`], and calls [`OverlayContext::frame`] once per animation frame.
//! Input methods never advance time: work deferred "to the next tick" runs on the next
//! [`OverlayContext::advance`] or [`OverlayContext::tick`].

use std::fmt;
use std::time::Duration;

use kurbo::Point;
use perch_tree::{LocalNode, NodeId, QueryFilter, Tree};

use crate::binder::Bindings;
use crate::config::ContextConfig;
use crate::geometry::GeometryEngine;
use crate::hover::HoverTracker;
use crate::portal::Portal;
use crate::registry::{OverlayRegistry, OverlayState};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::subscription::SubscriptionLedger;
use crate::types::{Key, OverlayIdentity, Outcome};
use crate::widgets::{self, SelectChange};

/// Deferred work owned by the context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Task {
    /// Hover-intent open, on behalf of the trigger that was entered.
    HoverOpen {
        id: OverlayIdentity,
        trigger: NodeId,
    },
    /// Hover-intent close.
    HoverClose(OverlayIdentity),
    /// Attach the outside-click listener one tick after opening.
    ArmClickAway(OverlayIdentity),
    /// Hide content once the exit transition has run.
    FinishExit(OverlayIdentity),
    /// Bind pass waiting for the geometry engine.
    RetryBind { root: NodeId, attempt: u32 },
}

/// Overlay coordinator for one page.
///
/// Holds the element tree, the overlay registry, trigger bindings, the portal, the
/// subscription ledger, and the virtual clock. Everything is mutated only through the
/// methods on this type.
pub struct OverlayContext {
    pub(crate) tree: Tree,
    pub(crate) document: NodeId,
    pub(crate) config: ContextConfig,
    pub(crate) registry: OverlayRegistry,
    pub(crate) bindings: Bindings,
    pub(crate) scheduler: Scheduler<Task>,
    pub(crate) ledger: SubscriptionLedger,
    pub(crate) portal: Portal,
    pub(crate) engine: Option<Box<dyn GeometryEngine>>,
    pub(crate) hover: HoverTracker<NodeId>,
    /// Identity whose open/close transition is running.
    pub(crate) in_flight: Option<OverlayIdentity>,
    pub(crate) select_changes: Vec<SelectChange>,
}

impl fmt::Debug for OverlayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayContext")
            .field("tree", &self.tree)
            .field("overlays", &self.registry.len())
            .field("subscriptions", &self.ledger.len())
            .field("pending_tasks", &self.scheduler.len())
            .field("engine", &self.engine.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for OverlayContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl OverlayContext {
    /// Context with an empty document and no geometry engine.
    ///
    /// Bind passes issued before an engine is installed are retried per
    /// [`ContextConfig::engine_retry`].
    pub fn new(config: ContextConfig) -> Self {
        let mut tree = Tree::new();
        let document = tree.insert(None, LocalNode::with_bounds(config.viewport));
        Self {
            tree,
            document,
            config,
            registry: OverlayRegistry::new(),
            bindings: Bindings::default(),
            scheduler: Scheduler::new(),
            ledger: SubscriptionLedger::new(),
            portal: Portal::new(),
            engine: None,
            hover: HoverTracker::new(),
            in_flight: None,
            select_changes: Vec::new(),
        }
    }

    /// Context with an engine installed from the start.
    pub fn with_engine(config: ContextConfig, engine: impl GeometryEngine + 'static) -> Self {
        let mut cx = Self::new(config);
        cx.install_engine(engine);
        cx
    }

    /// Install (or replace) the geometry engine.
    pub fn install_engine(&mut self, engine: impl GeometryEngine + 'static) {
        self.engine = Some(Box::new(engine));
        tracing::debug!("geometry engine installed");
    }

    /// Returns true once an engine is installed.
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// The document tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the document, for the markup layer.
    ///
    /// Report subtree replacements through [`OverlayContext::before_swap`] and
    /// [`OverlayContext::after_swap`].
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Root element of the document.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Settings in effect.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    /// Read-only view of the subscription ledger.
    pub fn ledger(&self) -> &SubscriptionLedger {
        &self.ledger
    }

    /// The shared portal container and the homes of the content it holds.
    pub fn portal(&self) -> &Portal {
        &self.portal
    }

    /// State of overlay `id`.
    pub fn state(&self, id: &str) -> Option<&OverlayState> {
        self.registry.get(&OverlayIdentity::new(id))
    }

    /// Returns true if overlay `id` is open.
    pub fn is_open(&self, id: &str) -> bool {
        self.state(id).is_some_and(OverlayState::is_open)
    }

    /// Open-scoped subscriptions plus pending hover/arming timers of overlay `id`.
    ///
    /// Zero whenever the overlay is closed and no hover timer is pending.
    pub fn live_resources(&self, id: &str) -> usize {
        let identity = OverlayIdentity::new(id);
        self.ledger.open_scoped(&identity)
            + self
                .registry
                .get(&identity)
                .map_or(0, OverlayState::pending_timers)
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Number of scheduled tasks.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    // --- time ---

    /// Move the clock forward by `dt`, running every task that falls due.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.scheduler.now() + dt;
        while let Some((handle, task)) = self.scheduler.pop_due(until) {
            self.run_task(handle, task);
        }
        self.scheduler.advance_clock(until);
    }

    /// Run work deferred to the next tick without moving the clock.
    pub fn tick(&mut self) {
        self.advance(Duration::ZERO);
    }

    /// Animation frame: re-position every open overlay against its reference.
    pub fn frame(&mut self) {
        let tracking = self.registry.listening(OverlayState::is_tracking);
        for id in tracking {
            if let Err(err) = self.update_position(&id) {
                tracing::debug!(overlay = %id, %err, "frame placement skipped");
            }
        }
    }

    fn run_task(&mut self, handle: TaskHandle, task: Task) {
        match task {
            Task::HoverOpen { id, trigger } => {
                let Some(state) = self.registry.get_mut(&id) else {
                    return;
                };
                if state.hover.open != Some(handle) {
                    return;
                }
                state.hover.open = None;
                self.open_from(trigger, &id);
            }
            Task::HoverClose(id) => {
                let Some(state) = self.registry.get_mut(&id) else {
                    return;
                };
                if state.hover.close != Some(handle) {
                    return;
                }
                state.hover.close = None;
                self.close_overlay(id.as_str(), false);
            }
            Task::ArmClickAway(id) => self.arm_click_away(&id, handle),
            Task::FinishExit(id) => self.finish_exit(&id, handle),
            Task::RetryBind { root, attempt } => self.retry_bind(root, attempt),
        }
    }

    // --- input ---

    /// Deliver a click to `target`.
    ///
    /// Element handlers run from the target up to the document root; unless one of
    /// them stops propagation, open overlays whose outside-click listener is armed and
    /// which contain neither the target nor its trigger are then dismissed.
    pub fn click(&mut self, target: NodeId) {
        if !self.tree.is_alive(target) {
            return;
        }
        let path = self.tree.path_to_root(target);
        for &node in path.iter().rev() {
            if self.element_click(node) == Outcome::Stop {
                tracing::trace!(?node, "click propagation stopped");
                return;
            }
        }
        self.dismiss_outside(target);
    }

    /// Hit-test `pt` and deliver a click to the element found there.
    pub fn pointer_down_at(&mut self, pt: Point) -> Option<NodeId> {
        let hit = self.tree.hit_test_point(pt, QueryFilter::POINTER)?;
        self.click(hit.node);
        Some(hit.node)
    }

    /// Move the pointer onto `target` (or off the document with `None`).
    pub fn pointer_move(&mut self, target: Option<NodeId>) {
        let path = target
            .map(|t| self.tree.path_to_root(t))
            .unwrap_or_default();
        for transition in self.hover.update_path(&path) {
            self.on_hover(transition);
        }
    }

    /// Hit-test `pt` and move the pointer onto the element found there.
    pub fn pointer_move_at(&mut self, pt: Point) -> Option<NodeId> {
        let target = self
            .tree
            .hit_test_point(pt, QueryFilter::POINTER)
            .map(|hit| hit.node);
        self.pointer_move(target);
        target
    }

    /// Deliver a key press. `focused` is the element holding keyboard focus, if any.
    pub fn key_down(&mut self, key: Key, focused: Option<NodeId>) {
        match key {
            Key::Escape => {
                for id in self.registry.listening(OverlayState::listens_for_escape) {
                    self.close_overlay(id.as_str(), false);
                }
            }
            Key::Enter | Key::Space => {
                if let Some(node) = focused.filter(|&n| self.tree.is_alive(n)) {
                    widgets::on_confirm_key(self, node);
                }
            }
            Key::Other(_) => {}
        }
    }

    fn element_click(&mut self, node: NodeId) -> Outcome {
        if let Some(id) = self.press_identity(node) {
            self.toggle_from(node, &id);
            return Outcome::Stop;
        }
        widgets::on_click(self, node)
    }

    fn dismiss_outside(&mut self, target: NodeId) {
        for id in self.registry.listening(OverlayState::listens_for_click_away) {
            let Some(state) = self.registry.get(&id) else {
                continue;
            };
            if !state.listens_for_click_away() {
                continue;
            }
            let inside = self.tree.contains(state.content, target)
                || self.tree.contains(state.trigger, target);
            if !inside {
                tracing::trace!(overlay = %id, "outside click");
                self.close_overlay(id.as_str(), false);
            }
        }
    }
}
