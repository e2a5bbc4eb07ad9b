//! Transport abstraction for relaychat.
//!
//! The relay protocol is text frames over a connection-oriented transport:
//! - `connect()` opens the connection
//! - `send()` transmits one JSON envelope
//! - `recv()` waits for the next JSON envelope
//! - `close()` terminates
//!
//! [`WsTransport`] speaks WebSocket; [`MockTransport`] is an in-memory
//! stand-in for tests.

mod mock;
mod ws;

pub use mock::MockTransport;
pub use ws::WsTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// A connection that carries relay envelopes as text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the relay at `url`.
    async fn connect(&self, url: &str) -> Result<(), TransportError>;

    /// Send one text frame.
    ///
    /// Returns once the frame is handed to the connection, not when the
    /// relay has processed it.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Receive the next text frame.
    ///
    /// Waits until a frame arrives or the connection closes.
    async fn recv(&self) -> Result<String, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn close(&self) -> Result<(), TransportError>;
}
