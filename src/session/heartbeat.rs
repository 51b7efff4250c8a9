//! Keepalive bookkeeping for the open connection.
//!
//! [`HeartbeatMonitor`] owns the ping cadence and the last-pong timestamp.
//! It is active if and only if the connection is Open: the supervisor
//! schedules the first tick on entering Open and cancels it (through the
//! timer registry) on leaving, so no heartbeat can fire for a superseded
//! connection. A peer PING is answered immediately, outside the cadence.
//! PONG receipt is recorded for liveness observability only; it does not
//! force a disconnect.

use std::time::Duration;

use tokio::time::Instant;

/// Heartbeat interval and liveness bookkeeping.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_pong_at: Option<Instant>,
}

impl HeartbeatMonitor {
    /// Creates a monitor with the given ping interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_pong_at: None,
        }
    }

    /// Instant at which the next PING is due, measured from `now`.
    #[must_use]
    pub fn next_ping_at(&self, now: Instant) -> Instant {
        now + self.interval
    }

    /// Records receipt of a peer PONG.
    pub fn record_pong(&mut self, now: Instant) {
        self.last_pong_at = Some(now);
    }

    /// Timestamp of the most recent PONG, if any was received on the
    /// current connection.
    #[must_use]
    pub const fn last_pong_at(&self) -> Option<Instant> {
        self.last_pong_at
    }

    /// Clears liveness state; called when the connection is torn down.
    pub fn reset(&mut self) {
        self.last_pong_at = None;
    }
}
