//! ClientConnection - one logical session to a relaychat relay.
//!
//! # Architecture
//!
//! The connection lifecycle is driven by the pure state machine in
//! chat-core; this module interprets its actions with real I/O.
//!
//! ```text
//! caller → ClientConnection → Transport → relay
//!               ↓        ↑
//!        chat-core   receive loop → mpsc::UnboundedSender<ClientEvent> → caller
//! ```
//!
//! `connect()` opens the transport, sends `register` immediately and spawns a
//! receive loop that turns every inbound envelope into a [`ClientEvent`].
//! Registration completes asynchronously when the relay answers; wait for
//! [`ClientEvent::Registered`] before sending.

use std::sync::Arc;

use chat_core::{Action, ConnectionState, Event, StatusEvent};
use chat_types::{
    ClientFrame, ContentType, DeliveryEnvelope, ErrorCode, MessageId, PhoneNumber, ServerFrame,
};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Envelope could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The phone number has no digits (or is otherwise unusable).
    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),

    /// A connection is already open or opening.
    #[error("already connected")]
    AlreadyConnected,

    /// The relay has not confirmed registration; retry once registered.
    #[error("not registered with the relay")]
    NotRegistered,

    /// `reconnect()` was called before any `connect()`.
    #[error("no previous connection to resume")]
    NeverConnected,
}

/// Things that happen on the connection, delivered in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Transport opened and `register` sent.
    Connected,
    /// Connection closed (dropped, or `disconnect()` called).
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
    /// The relay confirmed our phone.
    Registered {
        /// Phone the relay confirmed.
        phone: PhoneNumber,
    },
    /// A relayed message addressed to us.
    Message(DeliveryEnvelope),
    /// The relay accepted one of our messages.
    Ack {
        /// Relay-assigned id.
        id: MessageId,
        /// Acceptance time.
        timestamp: String,
    },
    /// Reply to `request_sync`.
    SyncDone {
        /// Messages replayed (always zero).
        count: u32,
    },
    /// Reply to `request_conversations`.
    Conversations {
        /// Peers with relay-side history (always empty).
        list: Vec<String>,
    },
    /// The relay rejected something, an inbound frame was not understood,
    /// or a connection attempt failed (`code` is `None`).
    Error {
        /// Error class, when one applies.
        code: Option<ErrorCode>,
        /// Human-readable detail.
        msg: String,
    },
}

#[derive(Debug, Default)]
struct Session {
    state: ConnectionState,
    url: Option<String>,
    phone: Option<PhoneNumber>,
    reader: Option<JoinHandle<()>>,
}

/// One logical session to the relay.
///
/// Never persists anything; inbound envelopes only become events.
pub struct ClientConnection<T: Transport> {
    transport: Arc<T>,
    session: Arc<Mutex<Session>>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl<T: Transport + 'static> ClientConnection<T> {
    /// Create a connection and the receiver for its events.
    pub fn new(transport: T) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let client = Self {
            transport: Arc::new(transport),
            session: Arc::new(Mutex::new(Session::default())),
            events,
        };
        (client, rx)
    }

    /// Open the transport and send `register` for the normalized `phone`.
    ///
    /// No retry: a failure is returned and also emitted as an error event.
    pub async fn connect(&self, url: &str, phone: &str) -> Result<(), ClientError> {
        let phone =
            PhoneNumber::normalize(phone).ok_or_else(|| ClientError::InvalidPhone(phone.into()))?;

        {
            let mut session = self.session.lock().await;
            let actions = transition(&mut session.state, Event::ConnectRequested);
            if !actions.contains(&Action::Connect) {
                return Err(ClientError::AlreadyConnected);
            }
            session.url = Some(url.to_string());
            session.phone = Some(phone.clone());
        }

        // The handshake runs unlocked so status() and disconnect() stay
        // responsive.
        let connected = self.transport.connect(url).await;

        let mut session = self.session.lock().await;
        if session.state != ConnectionState::Connecting {
            // disconnect() won the race.
            if connected.is_ok() {
                let _ = self.transport.close().await;
            }
            debug!(url, "Connection attempt abandoned");
            return Err(TransportError::ConnectionClosed.into());
        }

        if let Err(e) = connected {
            warn!(url, error = %e, "Connection to relay failed");
            let actions = transition(
                &mut session.state,
                Event::ConnectFailed {
                    error: e.to_string(),
                },
            );
            self.execute(&actions, &phone).await?;
            return Err(e.into());
        }

        info!(url, phone = %phone, "Connected to relay");
        let actions = transition(&mut session.state, Event::ConnectSucceeded);
        if let Err(e) = self.execute(&actions, &phone).await {
            transition(
                &mut session.state,
                Event::Disconnected {
                    reason: e.to_string(),
                },
            );
            let _ = self.transport.close().await;
            return Err(e);
        }

        session.reader = Some(self.spawn_reader());
        Ok(())
    }

    /// Open a new connection with the last url and phone.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        let (url, phone) = {
            let session = self.session.lock().await;
            match (&session.url, &session.phone) {
                (Some(url), Some(phone)) => (url.clone(), phone.to_string()),
                _ => return Err(ClientError::NeverConnected),
            }
        };
        if self.status().await != ConnectionState::Disconnected {
            self.disconnect().await?;
        }
        self.connect(&url, &phone).await
    }

    /// Close the connection.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        let actions = transition(&mut session.state, Event::DisconnectRequested);
        if let Some(reader) = session.reader.take() {
            reader.abort();
        }
        let phone = session.phone.clone();
        drop(session);

        if let Some(phone) = phone {
            self.execute(&actions, &phone).await?;
        }
        Ok(())
    }

    /// Send a `message` envelope to `to`.
    ///
    /// Completes once the envelope is handed to the transport. Correlate
    /// the later [`ClientEvent::Ack`] yourself if you need confirmation.
    pub async fn send(
        &self,
        to: &PhoneNumber,
        content: &str,
        content_type: ContentType,
    ) -> Result<(), ClientError> {
        self.require_registered().await?;
        debug!(to = %to, content_type = content_type.as_str(), "Sending message");
        self.send_frame(&ClientFrame::Message {
            to: to.to_string(),
            content: content.to_string(),
            content_type: Some(content_type),
        })
        .await
    }

    /// Send `sync`. The relay keeps no history, so the reply is always zero.
    pub async fn request_sync(&self, since: Option<&str>) -> Result<(), ClientError> {
        self.require_registered().await?;
        self.send_frame(&ClientFrame::Sync {
            since: since.map(str::to_string),
        })
        .await
    }

    /// Send `conversations`. The reply is always an empty list.
    pub async fn request_conversations(&self) -> Result<(), ClientError> {
        self.require_registered().await?;
        self.send_frame(&ClientFrame::Conversations).await
    }

    /// Current connection state.
    pub async fn status(&self) -> ConnectionState {
        self.session.lock().await.state.clone()
    }

    /// Check if the relay has confirmed registration.
    pub async fn is_registered(&self) -> bool {
        self.session.lock().await.state.is_registered()
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn require_registered(&self) -> Result<(), ClientError> {
        if self.is_registered().await {
            Ok(())
        } else {
            Err(ClientError::NotRegistered)
        }
    }

    async fn send_frame(&self, frame: &ClientFrame) -> Result<(), ClientError> {
        let text = frame
            .to_json()
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.transport.send(&text).await?;
        Ok(())
    }

    async fn execute(&self, actions: &[Action], phone: &PhoneNumber) -> Result<(), ClientError> {
        for action in actions {
            match action {
                // The caller performs the transport connect itself.
                Action::Connect => {}
                Action::SendRegister => {
                    self.send_frame(&ClientFrame::Register {
                        phone_number: phone.to_string(),
                    })
                    .await?;
                }
                Action::Disconnect => {
                    self.transport.close().await?;
                    info!(phone = %phone, "Disconnected from relay");
                }
                Action::EmitStatus(status) => emit(&self.events, status_event(status.clone())),
            }
        }
        Ok(())
    }

    fn spawn_reader(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let session = Arc::clone(&self.session);
        let events = self.events.clone();

        tokio::spawn(async move {
            loop {
                match transport.recv().await {
                    Ok(text) => dispatch(&text, &session, &events).await,
                    Err(e) => {
                        let mut session = session.lock().await;
                        let actions = transition(
                            &mut session.state,
                            Event::Disconnected {
                                reason: e.to_string(),
                            },
                        );
                        session.reader = None;
                        drop(session);

                        info!(reason = %e, "Relay connection closed");
                        for action in actions {
                            if let Action::EmitStatus(status) = action {
                                emit(&events, status_event(status));
                            }
                        }
                        break;
                    }
                }
            }
        })
    }
}

/// Route one inbound frame to its event.
async fn dispatch(
    text: &str,
    session: &Mutex<Session>,
    events: &mpsc::UnboundedSender<ClientEvent>,
) {
    let frame = match ServerFrame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Unrecognized frame from relay");
            emit(
                events,
                ClientEvent::Error {
                    code: Some(e.code()),
                    msg: e.to_string(),
                },
            );
            return;
        }
    };

    let event = match frame {
        ServerFrame::Registered { phone_number } => {
            let mut session = session.lock().await;
            let Some(phone) = PhoneNumber::normalize(&phone_number).or(session.phone.clone())
            else {
                return;
            };
            let actions = transition(&mut session.state, Event::RegistrationConfirmed { phone });
            drop(session);
            for action in actions {
                if let Action::EmitStatus(status) = action {
                    info!("Registered with relay");
                    emit(events, status_event(status));
                }
            }
            return;
        }
        ServerFrame::Message(envelope) => {
            debug!(id = %envelope.id, from = %envelope.from, "Message received");
            ClientEvent::Message(envelope)
        }
        ServerFrame::Ack { id, timestamp } => ClientEvent::Ack { id, timestamp },
        ServerFrame::SyncDone { count } => ClientEvent::SyncDone { count },
        ServerFrame::Conversations { list } => ClientEvent::Conversations { list },
        ServerFrame::Error { code, msg } => {
            warn!(code = code.as_str(), %msg, "Relay reported an error");
            ClientEvent::Error {
                code: Some(code),
                msg,
            }
        }
    };
    emit(events, event);
}

fn transition(state: &mut ConnectionState, event: Event) -> Vec<Action> {
    let (next, actions) = std::mem::take(state).on_event(event);
    *state = next;
    actions
}

fn status_event(status: StatusEvent) -> ClientEvent {
    match status {
        StatusEvent::Connected => ClientEvent::Connected,
        StatusEvent::Registered { phone } => ClientEvent::Registered { phone },
        StatusEvent::ConnectionFailed { error } => ClientEvent::Error {
            code: None,
            msg: error,
        },
        StatusEvent::Disconnected { reason } => ClientEvent::Disconnected { reason },
    }
}

fn emit(events: &mpsc::UnboundedSender<ClientEvent>, event: ClientEvent) {
    // A dropped receiver just means nobody is listening.
    let _ = events.send(event);
}
