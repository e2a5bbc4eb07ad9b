//! JSON envelopes exchanged between clients and the relay.
//!
//! Every envelope is a JSON object discriminated by its `type` field.
//! Decoding goes through an explicit step that yields a typed
//! [`ProtocolError`] instead of defaulting missing fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{ErrorCode, MessageId, ProtocolError};

/// Kind of payload carried in a message's `content`.
///
/// Values other than `image` and `audio` (including non-strings) are read
/// as [`ContentType::Text`], so a newer peer never gets its messages dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain UTF-8 text, stored verbatim.
    #[default]
    Text,
    /// Base64 image bytes on the wire; a relative file path once stored.
    Image,
    /// Base64 audio bytes on the wire; a relative file path once stored.
    Audio,
}

impl ContentType {
    /// Parse a wire value, ignoring ASCII case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Read any wire value, falling back to [`ContentType::Text`].
    pub fn from_wire(value: &Value) -> Self {
        value.as_str().and_then(Self::parse).unwrap_or_default()
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Whether the content is an attachment rather than text.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Audio)
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_wire(&Value::deserialize(deserializer)?))
    }
}

/// A relayed message as delivered to the recipient (and queued while the
/// recipient is unreachable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEnvelope {
    /// Relay-assigned message id.
    pub id: MessageId,
    /// Sender phone, as registered.
    pub from: String,
    /// Recipient phone, as addressed by the sender.
    pub to: String,
    /// Text, or base64 attachment bytes.
    pub content: String,
    /// Kind of content.
    #[serde(default)]
    pub content_type: ContentType,
    /// ISO-8601 acceptance time.
    pub timestamp: String,
}

/// Envelopes sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Bind this connection to a phone identifier.
    Register {
        /// Phone to register.
        #[serde(rename = "phoneNumber")]
        phone_number: String,
    },
    /// Relay a message to another phone.
    Message {
        /// Recipient phone.
        to: String,
        /// Text or base64 attachment. An empty string is valid.
        content: String,
        /// Kind of content (relay defaults to text).
        #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
        content_type: Option<ContentType>,
    },
    /// History handshake (the relay keeps no history).
    Sync {
        /// Lower bound requested by the client.
        #[serde(skip_serializing_if = "Option::is_none")]
        since: Option<String>,
    },
    /// Conversation list handshake (the relay keeps no history).
    Conversations,
}

impl ClientFrame {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of this envelope's type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Message { .. } => "message",
            Self::Sync { .. } => "sync",
            Self::Conversations => "conversations",
        }
    }

    /// Decode a client text frame.
    ///
    /// - not JSON (or not an object) → [`ProtocolError::Parse`]
    /// - missing/unrecognized `type` → [`ProtocolError::Unknown`]
    /// - recognized type with bad fields → [`ProtocolError::Invalid`]
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let (kind, fields) = split_envelope(text)?;

        match kind.as_str() {
            "register" => {
                let phone_number = optional_string(&fields, "phoneNumber")?
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| ProtocolError::invalid("phoneNumber is required"))?;
                Ok(Self::Register { phone_number })
            }
            "message" => {
                let to = optional_string(&fields, "to")?
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| ProtocolError::invalid("recipient (to) is required"))?;
                let content = match fields.get("content") {
                    None => return Err(ProtocolError::invalid("content is required")),
                    Some(Value::String(s)) => s.clone(),
                    Some(_) => return Err(ProtocolError::invalid("content must be a string")),
                };
                let content_type = match fields.get("contentType") {
                    None | Some(Value::Null) => None,
                    Some(raw) => Some(ContentType::from_wire(raw)),
                };
                Ok(Self::Message {
                    to,
                    content,
                    content_type,
                })
            }
            "sync" => Ok(Self::Sync {
                since: optional_string(&fields, "since")?,
            }),
            "conversations" => Ok(Self::Conversations),
            _ => Err(ProtocolError::Unknown { kind }),
        }
    }
}

/// Envelopes sent by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Registration accepted.
    Registered {
        /// The registered phone.
        #[serde(rename = "phoneNumber")]
        phone_number: String,
    },
    /// A relayed message (live or drained from the pending queue).
    Message(DeliveryEnvelope),
    /// The relay accepted a `message` for forwarding or queueing.
    ///
    /// Not proof that the recipient received it.
    Ack {
        /// Relay-assigned id of the accepted message.
        id: MessageId,
        /// Acceptance time.
        timestamp: String,
    },
    /// Reply to `sync`; always zero.
    SyncDone {
        /// Number of messages replayed.
        count: u32,
    },
    /// Reply to `conversations`; always empty.
    Conversations {
        /// Peers with server-side history.
        list: Vec<String>,
    },
    /// A rejected envelope.
    Error {
        /// Error class.
        code: ErrorCode,
        /// Human-readable detail.
        msg: String,
    },
}

impl ServerFrame {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a relay text frame.
    ///
    /// Uses the same taxonomy as [`ClientFrame::decode`]; unknown types are
    /// reported rather than dropped.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let (kind, fields) = split_envelope(text)?;

        match kind.as_str() {
            "registered" | "message" | "ack" | "sync_done" | "conversations" | "error" => {
                let mut object = fields;
                object.insert("type".into(), Value::String(kind));
                serde_json::from_value(Value::Object(object))
                    .map_err(|e| ProtocolError::invalid(e.to_string()))
            }
            _ => Err(ProtocolError::Unknown { kind }),
        }
    }
}

/// Parse a text frame into its `type` and remaining fields.
fn split_envelope(text: &str) -> Result<(String, Map<String, Value>), ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ProtocolError::Parse {
        reason: e.to_string(),
    })?;

    let Value::Object(mut fields) = value else {
        return Err(ProtocolError::Parse {
            reason: "envelope is not a JSON object".into(),
        });
    };

    let kind = match fields.remove("type") {
        Some(Value::String(kind)) => kind,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    Ok((kind, fields))
}

fn optional_string(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, ProtocolError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProtocolError::invalid(format!("{key} must be a string"))),
    }
}
