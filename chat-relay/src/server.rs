//! Main ChatRelay server coordination.
//!
//! ChatRelay owns the peer registry and the pending queue behind a single
//! async mutex, so no two `register`/`message` handlers interleave on the
//! same recipient. Each connection has its own outbound channel; pushing
//! into it never blocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chat_core::{ConnId, PeerRegistry, PendingQueue};
use chat_types::{DeliveryEnvelope, ServerFrame};
use tokio::sync::{mpsc, Mutex};

use crate::config::Config;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total WebSocket connections accepted.
    pub connections_total: AtomicU64,
    /// Total successful registrations.
    pub registrations_total: AtomicU64,
    /// Messages pushed straight to a live recipient.
    pub messages_relayed: AtomicU64,
    /// Messages queued for an offline recipient.
    pub messages_queued: AtomicU64,
    /// Queued messages handed over on registration.
    pub messages_drained: AtomicU64,
    /// Acks sent to senders.
    pub acks_total: AtomicU64,
    /// Envelopes answered with an `error` reply.
    pub errors_total: AtomicU64,
}

/// Outbound side of one connection, as stored in the registry.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    conn_id: ConnId,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

impl PeerHandle {
    /// Handle for connection `conn_id` writing into `tx`.
    pub fn new(conn_id: ConnId, tx: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self { conn_id, tx }
    }

    /// Connection id.
    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    /// Whether the connection's writer is still running.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame for this connection. Returns `false` if it has closed.
    pub fn push(&self, frame: ServerFrame) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Where an accepted message went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Pushed to the recipient's live connection.
    Live,
    /// Queued until the recipient registers.
    Queued,
}

#[derive(Debug, Default)]
struct RelayState {
    registry: PeerRegistry<PeerHandle>,
    pending: PendingQueue<DeliveryEnvelope>,
}

/// Main relay server.
///
/// Constructed by the entry point and shared with every connection by `Arc`.
#[derive(Debug)]
pub struct ChatRelay {
    config: Config,
    metrics: RelayMetrics,
    state: Mutex<RelayState>,
    next_conn_id: AtomicU64,
    started_at: Instant,
}

impl ChatRelay {
    /// Create a new relay with the given config.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            metrics: RelayMetrics::default(),
            state: Mutex::new(RelayState::default()),
            next_conn_id: AtomicU64::new(1),
            started_at: Instant::now(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Time since the relay was constructed.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Allocate an id for a new connection.
    pub fn next_conn_id(&self) -> ConnId {
        self.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Bind `phone` to `handle`, reply `registered` and hand over everything
    /// queued for it.
    ///
    /// All of this happens under the state lock, so a message relayed
    /// concurrently lands after the drained ones. Returns the number of
    /// drained messages.
    pub async fn register(&self, phone: &str, handle: PeerHandle) -> usize {
        let mut state = self.state.lock().await;

        if let Some(displaced) = state.registry.register(phone, handle.conn_id, handle.clone()) {
            if displaced != handle.conn_id {
                tracing::info!(phone, displaced, "Registration replaced an older connection");
            }
        }

        handle.push(ServerFrame::Registered {
            phone_number: phone.to_string(),
        });

        let drained = state.pending.drain_and_clear(phone);
        let count = drained.len();
        for envelope in drained {
            // At-most-once: a closed connection loses the rest.
            if !handle.push(ServerFrame::Message(envelope)) {
                tracing::warn!(phone, "Connection closed while draining pending messages");
                break;
            }
        }

        self.metrics.registrations_total.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .messages_drained
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Push `envelope` to its recipient's live connection, or queue it.
    pub async fn route(&self, envelope: DeliveryEnvelope) -> Delivery {
        let mut state = self.state.lock().await;

        if let Some(peer) = state.registry.lookup(&envelope.to) {
            if peer.is_open() && peer.push(ServerFrame::Message(envelope.clone())) {
                self.metrics.messages_relayed.fetch_add(1, Ordering::Relaxed);
                return Delivery::Live;
            }
        }

        tracing::debug!(to = %envelope.to, id = %envelope.id, "Recipient offline, queueing");
        let to = envelope.to.clone();
        state.pending.enqueue(&to, envelope);
        self.metrics.messages_queued.fetch_add(1, Ordering::Relaxed);
        Delivery::Queued
    }

    /// Forget `phone` when connection `conn_id` closes.
    ///
    /// No-op if a newer connection has registered the same phone.
    pub async fn unregister(&self, phone: &str, conn_id: ConnId) -> bool {
        self.state.lock().await.registry.remove(phone, conn_id)
    }

    /// Whether `phone` has a registered connection.
    pub async fn is_registered(&self, phone: &str) -> bool {
        self.state.lock().await.registry.is_registered(phone)
    }

    /// Number of registered peers.
    pub async fn peer_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Messages waiting for `phone`.
    pub async fn pending_for(&self, phone: &str) -> usize {
        self.state.lock().await.pending.pending_count(phone)
    }

    /// Messages waiting across all recipients.
    pub async fn total_pending(&self) -> usize {
        self.state.lock().await.pending.total_pending()
    }

    /// Offline phones with at least one waiting message.
    pub async fn pending_recipients(&self) -> usize {
        self.state.lock().await.pending.recipients()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::{ContentType, MessageId};

    fn relay() -> ChatRelay {
        ChatRelay::new(Config::default())
    }

    fn envelope(to: &str, content: &str) -> DeliveryEnvelope {
        DeliveryEnvelope {
            id: MessageId::relay(),
            from: "+1111".into(),
            to: to.into(),
            content: content.into(),
            content_type: ContentType::Text,
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    fn handle(relay: &ChatRelay) -> (PeerHandle, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PeerHandle::new(relay.next_conn_id(), tx), rx)
    }

    fn contents(rx: &mut mpsc::UnboundedReceiver<ServerFrame>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let ServerFrame::Message(env) = frame {
                out.push(env.content);
            }
        }
        out
    }

    #[tokio::test]
    async fn route_to_offline_peer_queues() {
        let relay = relay();
        assert_eq!(relay.route(envelope("+2222", "hi")).await, Delivery::Queued);
        assert_eq!(relay.pending_for("+2222").await, 1);
        assert_eq!(relay.metrics().messages_queued.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn register_replies_then_drains_in_order() {
        let relay = relay();
        relay.route(envelope("+2222", "one")).await;
        relay.route(envelope("+2222", "two")).await;

        relay.route(envelope("+3333", "other")).await;
        assert_eq!(relay.pending_recipients().await, 2);

        let (h, mut rx) = handle(&relay);
        assert_eq!(relay.register("+2222", h).await, 2);
        assert_eq!(relay.pending_recipients().await, 1);

        assert_eq!(
            rx.try_recv().unwrap(),
            ServerFrame::Registered {
                phone_number: "+2222".into()
            }
        );
        assert_eq!(contents(&mut rx), vec!["one", "two"]);
        assert_eq!(relay.pending_for("+2222").await, 0);
    }

    #[tokio::test]
    async fn route_to_live_peer_pushes() {
        let relay = relay();
        let (h, mut rx) = handle(&relay);
        relay.register("+2222", h).await;
        let _ = rx.try_recv();

        assert_eq!(relay.route(envelope("+2222", "live")).await, Delivery::Live);
        assert_eq!(contents(&mut rx), vec!["live"]);
        assert_eq!(relay.total_pending().await, 0);
    }

    #[tokio::test]
    async fn closed_connection_counts_as_offline() {
        let relay = relay();
        let (h, rx) = handle(&relay);
        relay.register("+2222", h).await;
        drop(rx);

        assert_eq!(relay.route(envelope("+2222", "late")).await, Delivery::Queued);
        assert_eq!(relay.pending_for("+2222").await, 1);
    }

    #[tokio::test]
    async fn newer_registration_survives_old_close() {
        let relay = relay();
        let (old, _old_rx) = handle(&relay);
        let (new, mut new_rx) = handle(&relay);
        let old_id = old.conn_id();

        relay.register("+2222", old).await;
        relay.register("+2222", new).await;
        assert!(!relay.unregister("+2222", old_id).await);
        assert!(relay.is_registered("+2222").await);

        let _ = new_rx.try_recv();
        assert_eq!(relay.route(envelope("+2222", "x")).await, Delivery::Live);
        assert_eq!(contents(&mut new_rx), vec!["x"]);
    }

    #[tokio::test]
    async fn conn_ids_are_unique() {
        let relay = relay();
        let a = relay.next_conn_id();
        let b = relay.next_conn_id();
        assert_ne!(a, b);
        assert_eq!(relay.metrics().connections_total.load(Ordering::Relaxed), 2);
    }
}
