//! Client connection state machine for relaychat.
//!
//! A pure, side-effect-free state machine for the client connection
//! lifecycle. It takes events as input and produces a new state plus a list
//! of actions for the client to execute.
//!
//! There is no reconnect timer: a failed or dropped connection lands in
//! `Disconnected` and stays there until the caller asks again.

use chat_types::PhoneNumber;

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the relay.
    #[default]
    Disconnected,
    /// Transport connection in progress.
    Connecting,
    /// Transport open, `register` sent, waiting for `registered`.
    AwaitingRegistration,
    /// The relay confirmed our phone; sends are allowed.
    Registered {
        /// Phone the relay confirmed.
        phone: PhoneNumber,
    },
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            (Self::Disconnected, Event::ConnectRequested) => {
                (Self::Connecting, vec![Action::Connect])
            }

            (Self::Connecting, Event::ConnectSucceeded) => (
                Self::AwaitingRegistration,
                vec![
                    Action::SendRegister,
                    Action::EmitStatus(StatusEvent::Connected),
                ],
            ),
            (Self::Connecting, Event::ConnectFailed { error }) => (
                Self::Disconnected,
                vec![Action::EmitStatus(StatusEvent::ConnectionFailed { error })],
            ),

            (Self::AwaitingRegistration, Event::RegistrationConfirmed { phone }) => (
                Self::Registered {
                    phone: phone.clone(),
                },
                vec![Action::EmitStatus(StatusEvent::Registered { phone })],
            ),

            (Self::AwaitingRegistration | Self::Registered { .. }, Event::Disconnected { reason }) => (
                Self::Disconnected,
                vec![Action::EmitStatus(StatusEvent::Disconnected { reason })],
            ),

            (
                Self::Connecting | Self::AwaitingRegistration | Self::Registered { .. },
                Event::DisconnectRequested,
            ) => (
                Self::Disconnected,
                vec![
                    Action::Disconnect,
                    Action::EmitStatus(StatusEvent::Disconnected {
                        reason: "user requested".into(),
                    }),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the relay has confirmed registration.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered { .. })
    }

    /// Check if the transport is open (registered or not).
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::AwaitingRegistration | Self::Registered { .. })
    }

    /// The registered phone, if any.
    pub fn phone(&self) -> Option<&PhoneNumber> {
        match self {
            Self::Registered { phone } => Some(phone),
            _ => None,
        }
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller requested a connection.
    ConnectRequested,
    /// Transport connection succeeded.
    ConnectSucceeded,
    /// Transport connection failed.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The relay answered `registered`.
    RegistrationConfirmed {
        /// Phone the relay confirmed.
        phone: PhoneNumber,
    },
    /// Transport was lost.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
    /// Caller requested disconnect.
    DisconnectRequested,
}

/// Actions the client should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport.
    Connect,
    /// Send `register` with our normalized phone.
    SendRegister,
    /// Close the transport.
    Disconnect,
    /// Tell collaborators about a status change.
    EmitStatus(StatusEvent),
}

/// Connection status changes surfaced to collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Transport opened.
    Connected,
    /// Registration confirmed.
    Registered {
        /// Phone the relay confirmed.
        phone: PhoneNumber,
    },
    /// A connection attempt failed.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The connection closed.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
}
