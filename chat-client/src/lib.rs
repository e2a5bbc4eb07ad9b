//! # chat-client
//!
//! Client library for the relaychat message relay.
//!
//! - [`ClientConnection`] - one session to the relay: registers the local
//!   phone, sends messages and turns inbound envelopes into [`ClientEvent`]s
//!   on a channel owned by the caller
//! - [`DeliveryRouter`] - files delivered and sent messages into the local
//!   [`chat_store::ConversationStore`]
//! - [`Transport`] - pluggable connection layer ([`WsTransport`],
//!   [`MockTransport`])
//!
//! There is no automatic reconnect and no outbound retry queue. A dropped
//! connection shows up as [`ClientEvent::Disconnected`]; call
//! [`ClientConnection::reconnect`] when you want to try again.
//!
//! ## Example
//!
//! ```ignore
//! use chat_client::{ClientConnection, ClientEvent, WsTransport};
//!
//! let (client, mut events) = ClientConnection::new(WsTransport::new());
//! client.connect("ws://localhost:9090", "+34600000001").await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ClientEvent::Registered { .. } = event {
//!         break;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod delivery;
pub mod transport;

pub use client::{ClientConnection, ClientError, ClientEvent};
pub use delivery::DeliveryRouter;
pub use transport::{MockTransport, Transport, TransportError, WsTransport};
