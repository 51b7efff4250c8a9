//! Outbound payload composition.
//!
//! [`OutboundComposer`] turns composed user intent into one of three wire
//! shapes: plain text, text plus an image batch, or text plus position
//! snapshots. Position attachments are captured structurally at attach
//! time; the display placeholder the editor inserts into the text for local
//! feedback is stripped before transmission and never re-parsed.

use crate::domain::{Attachments, ImageBlob, OutboundMessage, PositionAttachment};

/// Display placeholder the editor inserts into the draft text when a
/// position is attached. Purely local feedback; stripped on compose.
#[must_use]
pub fn position_placeholder(symbol: &str) -> String {
    format!("[[position:{symbol}]]")
}

/// User intent accumulated by the composer UI.
///
/// A draft carries either images or positions, never both: attaching one
/// kind replaces the other.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    /// Draft text, possibly containing position placeholders.
    pub text: String,
    /// Attachment payload, if any.
    pub attachments: Option<Attachments>,
}

impl MessageDraft {
    /// Creates a text-only draft.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: None,
        }
    }

    /// Attaches an ordered image batch, replacing any position attachments.
    #[must_use]
    pub fn with_images(mut self, images: Vec<ImageBlob>) -> Self {
        self.attachments = Some(Attachments::Images(images));
        self
    }

    /// Attaches position snapshots, replacing any image attachments.
    #[must_use]
    pub fn with_positions(mut self, positions: Vec<PositionAttachment>) -> Self {
        self.attachments = Some(Attachments::Positions(positions));
        self
    }
}

/// Builds wire payloads from drafts on behalf of one local participant.
#[derive(Debug)]
pub struct OutboundComposer {
    sender_id: String,
}

impl OutboundComposer {
    /// Creates a composer stamping `sender_id` on every payload.
    #[must_use]
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
        }
    }

    /// Composes a wire payload from `draft`.
    ///
    /// Position placeholders for each attached snapshot are stripped from
    /// the text; the structured data captured at attach time is substituted
    /// in. Returns `None` when the draft has neither text substance nor
    /// attachments, in which case no frame is transmitted at all.
    #[must_use]
    pub fn compose(&self, draft: MessageDraft) -> Option<OutboundMessage> {
        let (content, images, positions) = match draft.attachments {
            Some(Attachments::Images(images)) if !images.is_empty() => {
                (draft.text, Some(images), None)
            }
            Some(Attachments::Positions(positions)) if !positions.is_empty() => {
                let stripped = strip_placeholders(&draft.text, &positions);
                (stripped, None, Some(positions))
            }
            // An empty attachment list composes like a plain-text draft.
            _ => (draft.text, None, None),
        };

        if content.trim().is_empty() && images.is_none() && positions.is_none() {
            return None;
        }

        Some(OutboundMessage {
            content,
            sender_id: self.sender_id.clone(),
            images,
            portfolio_stocks: positions,
        })
    }
}

/// Removes the placeholder of every attached position from `text`.
fn strip_placeholders(text: &str, positions: &[PositionAttachment]) -> String {
    let mut stripped = text.to_string();
    for position in positions {
        stripped = stripped.replace(&position_placeholder(&position.symbol), "");
    }
    stripped.trim().to_string()
}
