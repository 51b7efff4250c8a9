//! Command and event types crossing the session boundary.
//!
//! The presentation layer drives the session with [`SessionCommand`]s and
//! consumes [`SessionEvent`]s; both travel over mpsc channels so every
//! state transition happens on the session's single cooperative task.

use std::time::Duration;

use crate::domain::Message;
use crate::session::composer::MessageDraft;

/// Connection lifecycle states of the supervisor's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport handle; reachable from every other state.
    Closed,
    /// Connect handshake in flight, bounded by the connect timeout.
    Connecting,
    /// Transport established; heartbeat active.
    Open,
    /// Teardown in progress: timers cancelled, handlers detached.
    Closing,
}

/// Commands the presentation layer sends into the session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Request a connection attempt; throttled under the `"connect"` key.
    Open,
    /// Compose and transmit a message. Best-effort: silently dropped when
    /// the connection is not open.
    Send(MessageDraft),
    /// A local input-change event for typing-state derivation.
    InputActivity,
    /// Tear the session down; terminal.
    Close,
}

/// Events the session emits toward the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The connection state machine transitioned.
    StateChanged(ConnectionState),
    /// The transport closed.
    Disconnected {
        /// Close code reported by the peer, if any.
        code: Option<u16>,
        /// Whether a reconnect will be attempted for this closure.
        will_retry: bool,
    },
    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        /// Attempt number within the current failure episode (1-based).
        attempt: u32,
        /// Delay before the attempt fires.
        delay: Duration,
    },
    /// The reconnect bound was exhausted. Persistent failure state; an
    /// explicit user-initiated retry is required.
    ConnectionUnavailable {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// No usable credential and refresh failed. Persistent failure state.
    ReauthRequired,
    /// A live message was admitted into the feed (appended).
    MessageAdmitted(Message),
    /// The history batch was merged; contains the newly admitted prefix in
    /// feed order.
    HistoryMerged(Vec<Message>),
    /// The presence snapshot changed; full replacement set.
    PresenceChanged(Vec<String>),
    /// The remote typing set changed; full current set.
    TypingChanged(Vec<String>),
    /// The session finished tearing down; no further events follow.
    Closed,
}
