//! # chat-core
//!
//! Pure logic for relaychat (no I/O, instant tests).
//!
//! This crate holds the bookkeeping the relay and client share without any
//! network or disk I/O:
//! - [`PeerRegistry`] - phone to live connection, scoped by connection id
//! - [`PendingQueue`] - per-recipient FIFO of undelivered messages
//! - [`ConnectionState`] - client connection lifecycle as a pure state machine
//!
//! The relay wraps the registry and queue in a single lock; the client
//! interprets the [`Action`]s produced by the state machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pending;
pub mod registry;
pub mod state;

pub use pending::PendingQueue;
pub use registry::{ConnId, PeerRegistry};
pub use state::{Action, ConnectionState, Event, StatusEvent};
