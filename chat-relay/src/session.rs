//! Per-connection session management.
//!
//! Each connection gets a Session that tracks registration and answers
//! envelopes. Replies and relayed messages for this connection all go
//! through one outbound channel, drained by the connection's writer.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chat_core::ConnId;
use chat_types::{
    ClientFrame, ContentType, DeliveryEnvelope, MessageId, ProtocolError, ServerFrame,
};
use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc;

use crate::server::{ChatRelay, Delivery, PeerHandle};

/// Session state machine states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for `register`.
    Unregistered,
    /// Bound to a phone.
    Registered {
        /// Phone given in `register`.
        phone: String,
    },
    /// Transport closed; terminal.
    Closed,
}

/// A per-connection session.
pub struct Session {
    relay: Arc<ChatRelay>,
    conn_id: ConnId,
    tx: mpsc::UnboundedSender<ServerFrame>,
    state: SessionState,
}

impl Session {
    /// Create a session and the receiver of its outbound frames.
    pub fn new(relay: Arc<ChatRelay>) -> (Self, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = relay.next_conn_id();
        let session = Self {
            relay,
            conn_id,
            tx,
            state: SessionState::Unregistered,
        };
        (session, rx)
    }

    /// Connection id.
    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one text frame.
    ///
    /// Never fails: bad input is answered with an `error` envelope and the
    /// connection stays open.
    pub async fn handle_text(&mut self, text: &str) {
        if self.state == SessionState::Closed {
            return;
        }

        let frame = match ClientFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => return self.reject(e),
        };

        let registered_as = match &self.state {
            SessionState::Registered { phone } => Some(phone.clone()),
            _ => None,
        };

        match (registered_as, frame) {
            (None, ClientFrame::Register { phone_number }) => {
                self.register(phone_number).await;
            }
            (Some(_), ClientFrame::Register { .. }) => {
                self.reject(ProtocolError::invalid("already registered"));
            }
            (
                Some(from),
                ClientFrame::Message {
                    to,
                    content,
                    content_type,
                },
            ) => {
                self.relay_message(from, to, content, content_type.unwrap_or_default())
                    .await;
            }
            (None, ClientFrame::Message { .. }) => {
                self.reject(ProtocolError::invalid("sender not registered"));
            }
            (Some(_), ClientFrame::Sync { .. }) => {
                self.reply(ServerFrame::SyncDone { count: 0 });
            }
            (Some(_), ClientFrame::Conversations) => {
                self.reply(ServerFrame::Conversations { list: Vec::new() });
            }
            (None, other) => {
                self.reject(ProtocolError::Unknown {
                    kind: other.kind().to_string(),
                });
            }
        }
    }

    /// Handle one binary frame: UTF-8 payloads are treated as text.
    pub async fn handle_binary(&mut self, data: &[u8]) {
        match std::str::from_utf8(data) {
            Ok(text) => self.handle_text(text).await,
            Err(_) => self.reject(ProtocolError::Parse {
                reason: "binary frame is not UTF-8".into(),
            }),
        }
    }

    /// Transport closed: drop our registration (if still ours).
    pub async fn close(&mut self) {
        let state = std::mem::replace(&mut self.state, SessionState::Closed);
        if let SessionState::Registered { phone } = state {
            if self.relay.unregister(&phone, self.conn_id).await {
                tracing::info!(phone = %phone, conn = self.conn_id, "Peer disconnected");
            } else {
                tracing::debug!(phone = %phone, conn = self.conn_id, "Superseded connection closed");
            }
        }
    }

    async fn register(&mut self, phone: String) {
        let handle = PeerHandle::new(self.conn_id, self.tx.clone());
        let drained = self.relay.register(&phone, handle).await;
        tracing::info!(phone = %phone, conn = self.conn_id, drained, "Peer registered");
        self.state = SessionState::Registered { phone };
    }

    async fn relay_message(
        &self,
        from: String,
        to: String,
        content: String,
        content_type: ContentType,
    ) {
        let envelope = DeliveryEnvelope {
            id: MessageId::relay(),
            from,
            to,
            content,
            content_type,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let id = envelope.id.clone();
        let timestamp = envelope.timestamp.clone();
        let (from, to) = (envelope.from.clone(), envelope.to.clone());

        let delivery = self.relay.route(envelope).await;
        tracing::debug!(
            %id,
            %from,
            %to,
            content_type = content_type.as_str(),
            queued = delivery == Delivery::Queued,
            "Message accepted"
        );

        self.relay.metrics().acks_total.fetch_add(1, Ordering::Relaxed);
        self.reply(ServerFrame::Ack { id, timestamp });
    }

    fn reject(&self, error: ProtocolError) {
        tracing::warn!(conn = self.conn_id, code = error.code().as_str(), %error, "Rejected envelope");
        self.relay.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
        self.reply(error.to_frame());
    }

    fn reply(&self, frame: ServerFrame) {
        // The receiver only goes away once the connection is gone.
        let _ = self.tx.send(frame);
    }
}
