//! # chat-types
//!
//! Wire format types for the relaychat protocol.
//!
//! This crate provides the foundational types used across all relaychat crates:
//! - [`PhoneNumber`], [`ConversationId`], [`MessageId`] - Identity types
//! - [`ClientFrame`], [`ServerFrame`] - JSON envelopes discriminated by `type`
//! - [`ProtocolError`] - The `parse` / `invalid` / `unknown` error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;

pub use envelope::{ClientFrame, ContentType, DeliveryEnvelope, ServerFrame};
pub use error::{ErrorCode, ProtocolError};
pub use ids::{
    unix_millis, ConversationId, MessageId, PhoneNumber, CONVERSATION_PREFIX, LOCAL_ID_PREFIX,
    RELAY_ID_PREFIX,
};
