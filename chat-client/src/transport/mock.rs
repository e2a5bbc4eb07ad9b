//! Mock transport for testing.
//!
//! Inbound frames are pushed through a channel, so `recv()` waits like a
//! real connection would. Sent frames are captured for inspection.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
enum Inbound {
    Frame(String),
    Drop,
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connected_url: Option<String>,
    connect_count: usize,
    sent_frames: Vec<String>,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    connect_delay: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<MockState>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

/// Mock transport for testing.
///
/// Clones share the same connection, so a test can keep one handle while
/// the client owns another.
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    /// Create a new, disconnected mock transport.
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(MockState::default()),
                inbound_tx,
                inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a text frame to the next `recv()`.
    pub fn push_inbound(&self, text: impl Into<String>) {
        let _ = self.inner.inbound_tx.send(Inbound::Frame(text.into()));
    }

    /// Simulate the relay dropping the connection.
    ///
    /// Frames pushed earlier are still received first.
    pub fn drop_connection(&self) {
        let _ = self.inner.inbound_tx.send(Inbound::Drop);
    }

    /// All frames that were sent, oldest first.
    pub fn sent_frames(&self) -> Vec<String> {
        self.state().sent_frames.clone()
    }

    /// The last frame that was sent.
    pub fn last_sent(&self) -> Option<String> {
        self.state().sent_frames.last().cloned()
    }

    /// The url passed to the last successful `connect()`.
    pub fn connected_url(&self) -> Option<String> {
        self.state().connected_url.clone()
    }

    /// Number of successful `connect()` calls.
    pub fn connect_count(&self) -> usize {
        self.state().connect_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.state().fail_next_connect = Some(error.to_string());
    }

    /// Make the next connect() take `delay` before completing.
    pub fn delay_next_connect(&self, delay: Duration) {
        self.state().connect_delay = Some(delay);
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.state().fail_next_send = Some(error.to_string());
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let delay = self.state().connect_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();

        if let Some(error) = state.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        state.connected = true;
        state.connected_url = Some(url.to_string());
        state.connect_count += 1;
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let mut state = self.state();

        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = state.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        state.sent_frames.push(text.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut rx = self.inner.inbound_rx.lock().await;
        match rx.recv().await {
            Some(Inbound::Frame(text)) => Ok(text),
            Some(Inbound::Drop) | None => {
                self.state().connected = false;
                Err(TransportError::ConnectionClosed)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state().connected = false;
        Ok(())
    }
}
