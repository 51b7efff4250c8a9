//! # region-chat-engine
//!
//! Live chat transport and reconciliation engine for a region-scoped
//! real-time conversation session. The engine opens and supervises one
//! persistent WebSocket connection, survives transient network failures
//! through bounded reconnection, exchanges keepalive signals, and merges a
//! one-shot historical batch with the continuous live stream into a single
//! ordered, duplicate-free feed for a presentation layer to consume.
//!
//! ## Architecture
//!
//! ```text
//! Presentation layer (commands / events)
//!     │
//!     ├── ChatSession / ConnectionSupervisor (session/)
//!     │       ├── ReconnectPolicy · ActionThrottle
//!     │       ├── HeartbeatMonitor · TimerRegistry
//!     │       ├── MessageReconciler · PresenceTracker · TypingCoordinator
//!     │       └── OutboundComposer
//!     │
//!     ├── Wire frames (domain/)
//!     │
//!     ├── CredentialProvider (auth/)   [injected]
//!     └── HistoryProvider (history/)   [injected]
//! ```
//!
//! Rendering, the history endpoint's internals, the chat hub, and
//! credential storage are external collaborators; the engine touches them
//! only through the narrow interfaces above.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod history;
pub mod session;
