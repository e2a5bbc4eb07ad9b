//! Error types for relaychat envelopes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ServerFrame;

/// Error code carried by an `error` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCode {
    /// Payload was not a JSON envelope at all.
    Parse,
    /// Envelope was well-formed but its content was not acceptable.
    Invalid,
    /// Envelope type is not handled in the current state.
    Unknown,
}

impl ErrorCode {
    /// Wire representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Parse => "parse",
            ErrorCode::Invalid => "invalid",
            ErrorCode::Unknown => "unknown",
        }
    }
}

/// Errors produced while decoding an envelope.
///
/// Always non-fatal: the relay answers with an `error` envelope and keeps
/// the connection open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Transport payload could not be parsed as an envelope.
    #[error("malformed envelope: {reason}")]
    Parse {
        /// Parser diagnostic.
        reason: String,
    },

    /// A known envelope type carried missing or malformed fields.
    #[error("invalid envelope: {reason}")]
    Invalid {
        /// What was wrong with the envelope.
        reason: String,
    },

    /// The envelope type is not recognized (or not accepted right now).
    #[error("unknown envelope type: {kind}")]
    Unknown {
        /// The offending `type` value.
        kind: String,
    },
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Wire error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::Parse { .. } => ErrorCode::Parse,
            ProtocolError::Invalid { .. } => ErrorCode::Invalid,
            ProtocolError::Unknown { .. } => ErrorCode::Unknown,
        }
    }

    /// Build the `error` envelope that answers this error.
    pub fn to_frame(&self) -> ServerFrame {
        ServerFrame::Error {
            code: self.code(),
            msg: self.to_string(),
        }
    }
}
