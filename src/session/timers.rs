//! Unified timer registry for the session.
//!
//! The supervisor owns every pending deadline (heartbeat tick, typing stop,
//! scheduled reconnect) through one registry with a single
//! [`cancel_all`](TimerRegistry::cancel_all) invoked on every state exit.
//! This replaces independently-tracked nullable timer handles and rules out
//! the class of bugs where a stale timer fires after teardown.

use std::collections::HashMap;

use tokio::time::Instant;

/// Kinds of deadline the session can have pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next keepalive PING while Open.
    Heartbeat,
    /// End of the local typing inactivity window.
    TypingStop,
    /// Scheduled reconnect attempt after an abnormal closure.
    Reconnect,
}

/// Pending deadlines, at most one per [`TimerKind`].
#[derive(Debug, Default)]
pub struct TimerRegistry {
    deadlines: HashMap<TimerKind, Instant>,
}

impl TimerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules (or reschedules) `kind` to fire at `at`.
    pub fn schedule(&mut self, kind: TimerKind, at: Instant) {
        self.deadlines.insert(kind, at);
    }

    /// Cancels a single pending timer, if present.
    pub fn cancel(&mut self, kind: TimerKind) {
        self.deadlines.remove(&kind);
    }

    /// Cancels every pending timer. Invoked on every state exit so a timer
    /// belonging to a superseded connection can never fire.
    pub fn cancel_all(&mut self) {
        self.deadlines.clear();
    }

    /// Earliest pending deadline, if any timer is scheduled.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every timer due at or before `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let due: Vec<TimerKind> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(kind, _)| *kind)
            .collect();
        for kind in &due {
            self.deadlines.remove(kind);
        }
        due
    }

    /// Returns `true` if `kind` is currently scheduled.
    #[must_use]
    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }
}
