// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancelable scheduled tasks over a virtual clock.
//!
//! The scheduler never reads wall-clock time. The host moves time forward and drains
//! due tasks, which makes hover-intent debouncing and exit transitions deterministic
//! in tests.
//!
//! ```
//! use std::time::Duration;
//! use perch_overlay::scheduler::Scheduler;
//!
//! let mut s = Scheduler::new();
//! let late = s.schedule(Duration::from_millis(200), "close");
//! let _early = s.schedule(Duration::from_millis(100), "open");
//! assert!(s.cancel(late));
//! assert!(!s.cancel(late), "second cancel is a no-op");
//!
//! let until = Duration::from_millis(500);
//! assert_eq!(s.pop_due(until).map(|(_, t)| t), Some("open"));
//! assert_eq!(s.pop_due(until), None);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle to a scheduled task. Cancelling a fired or cancelled task is a no-op.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Tasks keyed by due time, FIFO among equal due times.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next: u64,
    queue: BTreeMap<(Duration, u64), T>,
    due: HashMap<u64, Duration>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Empty scheduler at time zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next: 0,
            queue: BTreeMap::new(),
            due: HashMap::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` once `delay` has elapsed. A zero delay means the next drain.
    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskHandle {
        let seq = self.next;
        self.next += 1;
        let at = self.now + delay;
        self.queue.insert((at, seq), task);
        self.due.insert(seq, at);
        TaskHandle(seq)
    }

    /// Cancel a pending task. Returns `true` if it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.due.remove(&handle.0) {
            Some(at) => self.queue.remove(&(at, handle.0)).is_some(),
            None => false,
        }
    }

    /// Cancel the task in `slot`, leaving `None` behind.
    pub fn cancel_slot(&mut self, slot: &mut Option<TaskHandle>) -> bool {
        slot.take().is_some_and(|h| self.cancel(h))
    }

    /// Returns true if the task has neither fired nor been cancelled.
    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.due.contains_key(&handle.0)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no task is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remove the earliest task due at or before `until`, moving the clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TaskHandle, T)> {
        let (&(at, seq), _) = self.queue.first_key_value()?;
        if at > until {
            return None;
        }
        let task = self.queue.remove(&(at, seq))?;
        self.due.remove(&seq);
        self.now = self.now.max(at);
        Some((TaskHandle(seq), task))
    }

    /// Move the clock forward to `to`. Never moves it backwards.
    pub fn advance_clock(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn tasks_fire_in_due_order_then_fifo() {
        let mut s = Scheduler::new();
        s.schedule(MS * 20, 'c');
        s.schedule(MS * 10, 'a');
        s.schedule(MS * 10, 'b');
        let mut fired = Vec::new();
        while let Some((_, t)) = s.pop_due(MS * 100) {
            fired.push(t);
        }
        assert_eq!(fired, vec!['a', 'b', 'c']);
        assert_eq!(s.now(), MS * 20);
    }

    #[test]
    fn nothing_fires_before_its_time() {
        let mut s = Scheduler::new();
        let h = s.schedule(MS * 100, ());
        assert!(s.pop_due(MS * 99).is_none());
        assert!(s.is_pending(h));
        assert!(s.pop_due(MS * 100).is_some());
        assert!(!s.is_pending(h));
        assert!(!s.cancel(h), "fired tasks cannot be cancelled");
    }

    #[test]
    fn delays_are_relative_to_the_clock() {
        let mut s = Scheduler::new();
        s.advance_clock(MS * 50);
        s.schedule(MS * 10, ());
        assert!(s.pop_due(MS * 59).is_none());
        assert!(s.pop_due(MS * 60).is_some());
        s.advance_clock(MS * 10);
        assert_eq!(s.now(), MS * 60, "clock never runs backwards");
    }

    #[test]
    fn cancel_slot_clears_and_is_idempotent() {
        let mut s = Scheduler::new();
        let mut slot = Some(s.schedule(MS, ()));
        assert!(s.cancel_slot(&mut slot));
        assert!(slot.is_none());
        assert!(!s.cancel_slot(&mut slot));
        assert!(s.is_empty());
    }
}
