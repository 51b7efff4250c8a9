//! Domain layer: message records, wire frames, and region identity.
//!
//! This module contains the session's data model: the immutable message
//! record with its attachment union, the tagged inbound/outbound frame
//! types decoded once at the transport boundary, and the region scope key.

pub mod frame;
pub mod message;
pub mod region_id;

pub use frame::{
    ControlFrame, InboundFrame, OutboundControl, OutboundFrame, OutboundMessage, decode_content,
};
pub use message::{Attachments, ImageBlob, Message, MessageId, PositionAttachment};
pub use region_id::RegionId;
