//! Chat message records and attachment payloads.
//!
//! [`Message`] is the immutable unit admitted into the merged feed. Identity
//! is [`MessageId`]; uniqueness across the feed is enforced by the
//! reconciler's seen-id set, not here. Attachments are a tagged union: a
//! message carries either image blobs or portfolio-position snapshots,
//! never both.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a chat message.
///
/// Opaque to the engine: only equality and hashing matter. Used as the key
/// of the session's seen-id set for at-most-once admission into the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a `MessageId` from its raw server-assigned form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque encoded image blob reference.
///
/// The engine never inspects image contents; blobs are relayed as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageBlob(String);

impl ImageBlob {
    /// Wraps a raw encoded blob reference.
    #[must_use]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the raw encoded form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Snapshot of a portfolio position shared into the chat.
///
/// A value captured at attach time, not a live-updating reference: prices
/// and profit figures are frozen as of the moment the sender attached the
/// position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAttachment {
    /// Ticker symbol of the instrument.
    pub symbol: String,
    /// Human-readable instrument name.
    pub name: String,
    /// Number of units held.
    pub quantity: f64,
    /// Average purchase price per unit.
    pub avg_price: f64,
    /// Market price per unit at attach time.
    pub current_price: f64,
    /// Absolute profit or loss at attach time.
    pub profit_loss: f64,
    /// Profit or loss as a rate (e.g. `0.12` for +12%).
    pub profit_loss_rate: f64,
    /// Date of the first purchase of this position.
    pub first_purchase_date: String,
}

/// Attachment payload of a message: images or positions, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachments {
    /// Ordered batch of image blobs.
    Images(Vec<ImageBlob>),
    /// Ordered batch of position snapshots.
    Positions(Vec<PositionAttachment>),
}

impl Attachments {
    /// Returns `true` if the attachment list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Images(images) => images.is_empty(),
            Self::Positions(positions) => positions.is_empty(),
        }
    }
}

/// Immutable user-authored chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Server-assigned identity; unique within the merged feed.
    pub id: MessageId,
    /// Identity of the authoring participant.
    pub sender_id: String,
    /// Message text; may be empty for attachment-only messages.
    pub content: String,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional attachment payload.
    pub attachments: Option<Attachments>,
}

impl Message {
    /// Returns `true` if this message carries user-visible substance:
    /// non-empty text or a non-empty attachment list. An attachment-only
    /// message (e.g. a shared position with no caption) still qualifies.
    #[must_use]
    pub fn has_substance(&self) -> bool {
        !self.content.is_empty()
            || self
                .attachments
                .as_ref()
                .is_some_and(|a| !a.is_empty())
    }

    /// Returns `true` if this message was authored by `sender_id`.
    #[must_use]
    pub fn is_from(&self, sender_id: &str) -> bool {
        self.sender_id == sender_id
    }
}
