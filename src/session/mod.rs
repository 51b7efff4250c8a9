//! Session layer: connection supervision and feed reconciliation.
//!
//! [`supervisor::ChatSession`] is the entry point; the remaining modules
//! are the components it composes: the bounded reconnect policy, the
//! per-action throttle, heartbeat bookkeeping, the unified timer registry,
//! the message reconciler, presence and typing trackers, and the outbound
//! composer.

pub mod composer;
pub mod events;
pub mod heartbeat;
pub mod presence;
pub mod reconciler;
pub mod reconnect;
pub mod supervisor;
pub mod throttle;
pub mod timers;
pub mod typing;

pub use composer::{MessageDraft, OutboundComposer, position_placeholder};
pub use events::{ConnectionState, SessionCommand, SessionEvent};
pub use heartbeat::HeartbeatMonitor;
pub use presence::PresenceTracker;
pub use reconciler::MessageReconciler;
pub use reconnect::ReconnectPolicy;
pub use supervisor::ChatSession;
pub use throttle::ActionThrottle;
pub use timers::{TimerKind, TimerRegistry};
pub use typing::TypingCoordinator;
