//! Feed reconciliation: history batch + live stream, deduplicated.
//!
//! Two independent sources feed one ordered output. The live stream appends
//! in arrival order; the one-shot history batch is prepended ahead of
//! whatever is already in the feed, preserving its own relative order. A
//! session-lifetime seen-id set gives at-most-once admission across both
//! paths and across reconnects; duplicates are dropped silently.

use std::collections::HashSet;

use crate::domain::{Message, MessageId};

/// Merges the historical batch and the live stream into one ordered,
/// duplicate-free feed.
///
/// The seen-id set lives as long as the session: it is NOT cleared on
/// reconnect, only when the session itself is torn down, so frames
/// redelivered across a reconnect are deduplicated too.
#[derive(Debug, Default)]
pub struct MessageReconciler {
    feed: Vec<Message>,
    seen: HashSet<MessageId>,
}

impl MessageReconciler {
    /// Creates an empty reconciler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits one live-stream message, appending it in arrival order.
    ///
    /// Returns `true` if the message was new; `false` for a silently
    /// dropped duplicate.
    pub fn admit_live(&mut self, message: Message) -> bool {
        if self.seen.contains(&message.id) {
            tracing::trace!(id = %message.id, "duplicate live frame dropped");
            return false;
        }
        self.seen.insert(message.id.clone());
        self.feed.push(message);
        true
    }

    /// Merges the one-shot history batch (oldest-first).
    ///
    /// Unseen entries are prepended ahead of the existing feed, preserving
    /// their relative order; live messages admitted before history resolved
    /// keep their position after the prefix. Returns the messages actually
    /// admitted, in feed order.
    pub fn merge_history(&mut self, batch: Vec<Message>) -> Vec<Message> {
        let mut admitted = Vec::new();
        for message in batch {
            if self.seen.contains(&message.id) {
                tracing::trace!(id = %message.id, "duplicate history entry dropped");
                continue;
            }
            self.seen.insert(message.id.clone());
            admitted.push(message);
        }
        if !admitted.is_empty() {
            let mut merged = Vec::with_capacity(admitted.len() + self.feed.len());
            merged.extend(admitted.iter().cloned());
            merged.append(&mut self.feed);
            self.feed = merged;
        }
        admitted
    }

    /// The merged feed, oldest-first.
    #[must_use]
    pub fn feed(&self) -> &[Message] {
        &self.feed
    }

    /// Number of distinct ids admitted so far.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
