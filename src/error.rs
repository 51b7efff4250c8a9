//! Session error taxonomy.
//!
//! [`ChatError`] is the central error type for the engine. Variants split
//! along the recovery strategy: transport failures are retried through the
//! bounded reconnect policy, protocol failures are logged and discarded,
//! and terminal variants surface to the presentation layer as a persistent
//! "connection unavailable" state requiring an explicit user retry.
//!
//! A throttle rejection is deliberately NOT an error: invoking an action
//! inside its cooldown window is a silent no-op.

use std::time::Duration;

/// Central error type for the chat session engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Socket-level failure: connect error, mid-stream error, or any
    /// non-normal close. Recovered locally via the reconnect policy.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connect handshake exceeded its fixed deadline. Treated exactly
    /// like an abnormal closure.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// No usable credential: the provider returned nothing and a refresh
    /// did not resolve it. Terminal; the user must re-authenticate.
    #[error("re-authentication required")]
    AuthRequired,

    /// A frame that failed to parse or match any known shape. Logged and
    /// discarded; never crashes the session or blocks later frames.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The historical-message collaborator failed.
    #[error("history fetch failed: {0}")]
    History(String),

    /// The reconnect attempt bound was exhausted within one failure
    /// episode. Terminal; no further attempt is scheduled.
    #[error("reconnect attempts exhausted after {attempts} tries")]
    RetriesExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Invalid engine configuration (e.g. an unparseable endpoint URL).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ChatError {
    /// Returns `true` for errors that end the session: the user must take
    /// explicit action (re-authenticate or retry) before chat can resume.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::RetriesExhausted { .. })
    }

    /// Returns `true` for transport-class failures that the reconnect
    /// policy may recover from.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ConnectTimeout(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::History(err.to_string())
    }
}
