//! Online participant tracking.
//!
//! Presence arrives as full snapshots: each `USERS` frame replaces the set
//! wholesale, never patches it incrementally. No other component mutates
//! the set.

use std::collections::BTreeSet;

/// Current participant set of the region, replaced on each snapshot frame.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    users: BTreeSet<String>,
}

impl PresenceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the participant set with a snapshot.
    ///
    /// Returns `true` if the set actually changed.
    pub fn replace(&mut self, users: Vec<String>) -> bool {
        let snapshot: BTreeSet<String> = users.into_iter().collect();
        if snapshot == self.users {
            return false;
        }
        self.users = snapshot;
        true
    }

    /// Display names of everyone currently online, sorted.
    #[must_use]
    pub fn users(&self) -> Vec<String> {
        self.users.iter().cloned().collect()
    }

    /// Number of participants online.
    #[must_use]
    pub fn count(&self) -> usize {
        self.users.len()
    }
}
