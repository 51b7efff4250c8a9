//! Typing-state coordination, local and remote.
//!
//! Local side: the first input event of a burst emits a start-typing frame;
//! every event (re)arms the stop deadline; when the deadline elapses a
//! stop-typing frame is emitted. Rapid bursts inside the window collapse to
//! a single start emission.
//!
//! Remote side: `TYPING` frames add or remove names from the typing set.
//! Remote entries have no timeout-based expiry; a peer that disconnects
//! without a final `isTyping:false` stays in the set for the session's
//! lifetime (preserved behavior of the protocol).

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

/// Derives local typing transitions and tracks remote announcements.
#[derive(Debug)]
pub struct TypingCoordinator {
    idle_window: Duration,
    stop_deadline: Option<Instant>,
    remote: BTreeSet<String>,
}

impl TypingCoordinator {
    /// Creates a coordinator with the given inactivity window.
    #[must_use]
    pub fn new(idle_window: Duration) -> Self {
        Self {
            idle_window,
            stop_deadline: None,
            remote: BTreeSet::new(),
        }
    }

    /// Registers a local input-change event at `now`.
    ///
    /// Returns `true` when a start-typing frame should be emitted, which
    /// happens only if no stop deadline was pending. The stop deadline is
    /// (re)armed either way.
    pub fn on_local_input(&mut self, now: Instant) -> bool {
        let emit_start = self.stop_deadline.is_none();
        self.stop_deadline = Some(now + self.idle_window);
        emit_start
    }

    /// The pending stop deadline the supervisor should schedule, if any.
    #[must_use]
    pub const fn stop_deadline(&self) -> Option<Instant> {
        self.stop_deadline
    }

    /// Handles the stop-deadline firing at `now`.
    ///
    /// Returns `true` when a stop-typing frame should be emitted and clears
    /// the pending state; a stale firing (deadline re-armed since the timer
    /// was scheduled) is ignored.
    pub fn on_stop_deadline(&mut self, now: Instant) -> bool {
        match self.stop_deadline {
            Some(deadline) if now >= deadline => {
                self.stop_deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Clears local pending state without emitting; used on teardown.
    pub fn reset_local(&mut self) {
        self.stop_deadline = None;
    }

    /// Applies a remote typing announcement.
    ///
    /// Returns `true` if the typing set changed.
    pub fn on_remote(&mut self, member_name: &str, is_typing: bool) -> bool {
        if is_typing {
            self.remote.insert(member_name.to_string())
        } else {
            self.remote.remove(member_name)
        }
    }

    /// Names currently announcing "typing", sorted.
    #[must_use]
    pub fn remote_typers(&self) -> Vec<String> {
        self.remote.iter().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn coordinator() -> TypingCoordinator {
        TypingCoordinator::new(Duration::from_millis(1_000))
    }

    #[tokio::test(start_paused = true)]
    async fn first_input_emits_start() {
        let mut typing = coordinator();
        assert!(typing.on_local_input(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_single_start() {
        // Continuous typing for 1200 ms emits exactly one start.
        let mut typing = coordinator();
        let start = Instant::now();
        let mut starts = 0;
        for offset in [0, 300, 600, 900, 1_200] {
            if typing.on_local_input(start + Duration::from_millis(offset)) {
                starts += 1;
            }
        }
        assert_eq!(starts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_fires_after_idle_window() {
        let mut typing = coordinator();
        let start = Instant::now();
        let _ = typing.on_local_input(start);
        assert_eq!(
            typing.stop_deadline(),
            Some(start + Duration::from_millis(1_000))
        );
        assert!(typing.on_stop_deadline(start + Duration::from_millis(1_000)));
        assert!(typing.stop_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rearmed_deadline_ignores_stale_firing() {
        let mut typing = coordinator();
        let start = Instant::now();
        let _ = typing.on_local_input(start);
        // More input re-arms the deadline past the original firing point.
        let _ = typing.on_local_input(start + Duration::from_millis(800));
        assert!(!typing.on_stop_deadline(start + Duration::from_millis(1_000)));
        assert!(typing.on_stop_deadline(start + Duration::from_millis(1_800)));
    }

    #[tokio::test(start_paused = true)]
    async fn input_after_stop_emits_start_again() {
        let mut typing = coordinator();
        let start = Instant::now();
        assert!(typing.on_local_input(start));
        assert!(typing.on_stop_deadline(start + Duration::from_millis(1_000)));
        assert!(typing.on_local_input(start + Duration::from_millis(2_000)));
    }

    #[test]
    fn remote_set_tracks_announcements() {
        let mut typing = coordinator();
        assert!(typing.on_remote("bob", true));
        assert!(typing.on_remote("carol", true));
        assert!(typing.on_remote("bob", false));
        assert_eq!(typing.remote_typers(), vec!["carol".to_string()]);
    }

    #[test]
    fn remote_entries_never_expire() {
        let mut typing = coordinator();
        let _ = typing.on_remote("ghost", true);
        // No deadline-driven path touches the remote set.
        assert_eq!(typing.remote_typers(), vec!["ghost".to_string()]);
    }
}
