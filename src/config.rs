//! Engine configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Protocol constants carry the defaults
//! the chat hub was tuned for; deployments normally only override the
//! endpoint URLs, region, and sender identity.

use std::time::Duration;

use crate::domain::RegionId;
use crate::error::ChatError;

/// Top-level session configuration.
///
/// Loaded once at startup via [`ChatConfig::from_env`], or constructed
/// directly by embedding applications.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base WebSocket URL of the chat hub (e.g. `wss://hub.example.com`).
    /// The session appends `/ws/chat/region` plus query parameters.
    pub ws_base_url: String,

    /// Base HTTP URL of the history collaborator.
    pub history_base_url: String,

    /// Region the session is scoped to.
    pub region_id: RegionId,

    /// Identity of the local participant, stamped on outbound messages.
    pub sender_id: String,

    /// Maximum number of historical messages fetched once per session.
    pub history_limit: usize,

    /// Deadline for the WebSocket connect handshake.
    pub connect_timeout: Duration,

    /// Interval between keepalive PINGs while the connection is open.
    pub heartbeat_interval: Duration,

    /// Maximum reconnect attempts within one failure episode.
    pub reconnect_max_attempts: u32,

    /// Base delay of the reconnect schedule; grows linearly for two
    /// attempts, then plateaus.
    pub reconnect_base_delay: Duration,

    /// Inactivity window after which a stop-typing frame is emitted.
    pub typing_idle_window: Duration,

    /// Cooldown window of the per-action throttle guard.
    pub throttle_window: Duration,
}

impl ChatConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the protocol defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if `CHAT_REGION_ID` is set but cannot
    /// be parsed as an integer.
    pub fn from_env() -> Result<Self, ChatError> {
        dotenvy::dotenv().ok();

        let region_id = match std::env::var("CHAT_REGION_ID") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(RegionId::new)
                .map_err(|_| ChatError::Config(format!("CHAT_REGION_ID is not numeric: {raw}")))?,
            Err(_) => RegionId::new(1),
        };

        Ok(Self {
            ws_base_url: std::env::var("CHAT_WS_BASE_URL")
                .unwrap_or_else(|_| "ws://localhost:8080".to_string()),
            history_base_url: std::env::var("CHAT_HISTORY_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            region_id,
            sender_id: std::env::var("CHAT_SENDER_ID").unwrap_or_else(|_| "anonymous".to_string()),
            history_limit: parse_env("CHAT_HISTORY_LIMIT", 50),
            connect_timeout: Duration::from_millis(parse_env("CHAT_CONNECT_TIMEOUT_MS", 10_000)),
            heartbeat_interval: Duration::from_millis(parse_env(
                "CHAT_HEARTBEAT_INTERVAL_MS",
                30_000,
            )),
            reconnect_max_attempts: parse_env("CHAT_RECONNECT_MAX_ATTEMPTS", 5),
            reconnect_base_delay: Duration::from_millis(parse_env(
                "CHAT_RECONNECT_BASE_DELAY_MS",
                500,
            )),
            typing_idle_window: Duration::from_millis(parse_env("CHAT_TYPING_IDLE_MS", 1_000)),
            throttle_window: Duration::from_millis(parse_env("CHAT_THROTTLE_WINDOW_MS", 1_000)),
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://localhost:8080".to_string(),
            history_base_url: "http://localhost:8080".to_string(),
            region_id: RegionId::new(1),
            sender_id: "anonymous".to_string(),
            history_limit: 50,
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_max_attempts: 5,
            reconnect_base_delay: Duration::from_millis(500),
            typing_idle_window: Duration::from_millis(1_000),
            throttle_window: Duration::from_millis(1_000),
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
