//! Wire frame types: the inbound tagged union and outbound encodings.
//!
//! Every inbound text frame is decoded exactly once at the transport
//! boundary into [`InboundFrame`]: either a control frame (ping, pong,
//! typing, presence snapshot) or a content frame carrying a [`Message`].
//! Frame kind is decided by the presence of a `"type"` discriminator, not
//! by ad hoc field probing downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Attachments, ImageBlob, Message, MessageId, PositionAttachment};
use crate::error::ChatError;

/// Inbound frame after boundary decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Protocol/session-state frame routed to the supervisor's components.
    Control(ControlFrame),
    /// User-authored message routed to the reconciler.
    Content(Message),
}

/// Control frames understood by the session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE", rename_all_fields = "camelCase")]
pub enum ControlFrame {
    /// Keepalive probe from the peer; answered with a PONG immediately.
    Ping,
    /// Keepalive reply from the peer; timestamp recorded for liveness.
    Pong,
    /// A remote participant started or stopped typing.
    Typing {
        /// Display name of the announcing participant.
        member_name: String,
        /// `true` to add to the typing set, `false` to remove.
        is_typing: bool,
    },
    /// Full replacement snapshot of the online participant set.
    #[serde(rename = "USERS")]
    Presence {
        /// Display names of every participant currently online.
        users: Vec<String>,
    },
}

/// Control frames the session emits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE", rename_all_fields = "camelCase")]
pub enum OutboundControl {
    /// Keepalive probe sent at the heartbeat interval.
    Ping,
    /// Immediate reply to a peer PING.
    Pong,
    /// Local typing-state transition announcement.
    Typing {
        /// `true` on the first keystroke of a burst, `false` after the
        /// inactivity window elapses.
        is_typing: bool,
    },
}

/// Outbound content payload built by the composer.
///
/// Exactly one of `images` / `portfolio_stocks` may be present; absent
/// lists are omitted from the wire entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Message text with position placeholders already stripped.
    pub content: String,
    /// Identity of the local participant.
    pub sender_id: String,
    /// Ordered image batch, transmitted as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageBlob>>,
    /// Ordered position snapshots captured at attach time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_stocks: Option<Vec<PositionAttachment>>,
}

/// Any frame the session can transmit.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Control frame (ping, pong, typing).
    Control(OutboundControl),
    /// Composed user message.
    Message(OutboundMessage),
}

impl OutboundFrame {
    /// Encodes the frame as its JSON wire text.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Protocol`] if serialization fails, which would
    /// indicate a bug in the frame types rather than bad input.
    pub fn encode(&self) -> Result<String, ChatError> {
        let encoded = match self {
            Self::Control(control) => serde_json::to_string(control),
            Self::Message(message) => serde_json::to_string(message),
        };
        encoded.map_err(|e| ChatError::Protocol(format!("outbound encoding failed: {e}")))
    }
}

/// Raw inbound content frame before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContent {
    id: MessageId,
    sender_id: String,
    #[serde(default)]
    content: String,
    created_at: DateTime<Utc>,
    images: Option<Vec<ImageBlob>>,
    portfolio_stocks: Option<Vec<PositionAttachment>>,
}

impl InboundFrame {
    /// Decodes one inbound text frame.
    ///
    /// Frames carrying a `"type"` field are control frames; everything else
    /// must be a content frame with non-empty text or a non-empty attachment
    /// list. A content frame with both image and position attachments is
    /// rejected: the attachment payload is a tagged union on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Protocol`] for unparseable JSON, unknown control
    /// types, substanceless content frames, or mixed attachment kinds. The
    /// caller logs and discards; a malformed frame never affects the feed.
    pub fn decode(text: &str) -> Result<Self, ChatError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| ChatError::Protocol(format!("malformed frame: {e}")))?;

        if value.get("type").is_some() {
            let control: ControlFrame = serde_json::from_value(value)
                .map_err(|e| ChatError::Protocol(format!("unknown control frame: {e}")))?;
            return Ok(Self::Control(control));
        }

        decode_content(value).map(Self::Content)
    }
}

/// Decodes a JSON value as a content frame, validating its substance.
///
/// Shared between the live-stream path and the history collaborator, whose
/// batch entries use the same wire shape.
///
/// # Errors
///
/// Returns [`ChatError::Protocol`] for a malformed frame, mixed attachment
/// kinds, or a frame with neither text nor attachments.
pub fn decode_content(value: serde_json::Value) -> Result<Message, ChatError> {
    let wire: WireContent = serde_json::from_value(value)
        .map_err(|e| ChatError::Protocol(format!("malformed content frame: {e}")))?;

    let attachments = match (wire.images, wire.portfolio_stocks) {
        (Some(_), Some(_)) => {
            return Err(ChatError::Protocol(
                "content frame carries both images and positions".to_string(),
            ));
        }
        (Some(images), None) => Some(Attachments::Images(images)),
        (None, Some(positions)) => Some(Attachments::Positions(positions)),
        (None, None) => None,
    };

    let message = Message {
        id: wire.id,
        sender_id: wire.sender_id,
        content: wire.content,
        created_at: wire.created_at,
        attachments,
    };

    if !message.has_substance() {
        return Err(ChatError::Protocol(
            "content frame carries neither text nor attachments".to_string(),
        ));
    }

    Ok(message)
}
