//! Per-action cooldown guard.
//!
//! [`ActionThrottle`] prevents repeated invocation of the same named action
//! within a fixed window. Rejection is a silent no-op by contract, never an
//! error: callers simply skip the effect.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Generic per-key debounce guard.
///
/// Each key tracks the instant of its last accepted firing; a second
/// attempt inside the cooldown window is refused. Keys in use by the
/// session are `"connect"` and `"reconnect"`.
#[derive(Debug)]
pub struct ActionThrottle {
    window: Duration,
    last_fired: HashMap<String, Instant>,
}

impl ActionThrottle {
    /// Creates a throttle with the given cooldown window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: HashMap::new(),
        }
    }

    /// Attempts to fire `key` at `now`.
    ///
    /// Returns `true` and records the firing if the key has not fired
    /// within the window; returns `false` (no-op) otherwise.
    pub fn try_fire(&mut self, key: &str, now: Instant) -> bool {
        if let Some(last) = self.last_fired.get(key)
            && now.duration_since(*last) < self.window
        {
            tracing::trace!(key, "action throttled");
            return false;
        }
        self.last_fired.insert(key.to_string(), now);
        true
    }
}
