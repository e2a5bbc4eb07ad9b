//! # chat-relay
//!
//! Phone-addressed message relay for relaychat.
//!
//! This crate implements a relay server that:
//! - Accepts WebSocket connections and binds each to a phone identifier
//! - Forwards messages to the recipient's live connection
//! - Queues messages in memory while the recipient is offline and hands
//!   them over when it registers
//! - Keeps no history: nothing survives a restart
//!
//! ## Architecture
//!
//! ```text
//! Phone A ──┐                          ┌── Phone B
//!           │       WebSocket          │
//!           ├─────────────────────────►│
//!       ┌───┴──────────────────────────┴───┐
//!       │            chat-relay            │
//!       │  PeerRegistry   PendingQueue     │
//!       │  (one lock, owned by ChatRelay)  │
//!       └──────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! JSON text frames discriminated by `type`:
//! - `register` → `registered` (+ queued messages)
//! - `message` → `ack` (always, whether delivered or queued)
//! - `sync` → `sync_done` (count is always zero)
//! - `conversations` → `conversations` (list is always empty)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod session;
mod ws;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use config::{Config, ConfigError};
pub use error::{RelayError, Result};
pub use server::{ChatRelay, Delivery, PeerHandle, RelayMetrics};
pub use session::{Session, SessionState};

/// Bind the listener configured in `relay`.
pub async fn bind(relay: &ChatRelay) -> Result<TcpListener> {
    Ok(TcpListener::bind(&relay.config().server.bind_address).await?)
}

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve<F>(relay: Arc<ChatRelay>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = http::build_router(relay);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
