//! Bounded reconnect policy.
//!
//! Decides whether another connection attempt is allowed within the current
//! failure episode and computes its delay: linear growth for the first two
//! attempts, then a plateau, bounding worst-case wait while still backing
//! off. The attempt counter resets exactly on transition into Open.

use std::time::Duration;

/// Reconnect decision-maker for one failure episode.
#[derive(Debug)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Creates a policy allowing at most `max_attempts` reconnects per
    /// episode with the given base delay.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            attempt_count: 0,
        }
    }

    /// Requests permission for another attempt.
    ///
    /// Returns `None` when the bound is exhausted (terminal failure is
    /// reported upward by the caller); otherwise increments the attempt
    /// counter and returns the delay `base × min(attempt, 2)`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.max_attempts {
            return None;
        }
        self.attempt_count = self.attempt_count.saturating_add(1);
        let factor = self.attempt_count.min(2);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Resets the attempt counter; called exactly on transition into Open.
    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Attempts consumed within the current episode.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Configured attempt bound.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
