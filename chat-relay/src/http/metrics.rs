//! Prometheus metrics endpoint.

use crate::server::ChatRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Gauges describe current state; counters are monotonic since startup.
pub async fn metrics_handler(Extension(relay): Extension<Arc<ChatRelay>>) -> impl IntoResponse {
    let body = render(&relay).await;
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

async fn render(relay: &ChatRelay) -> String {
    let m = relay.metrics();

    let peers = relay.peer_count().await;
    let pending = relay.total_pending().await;
    let recipients = relay.pending_recipients().await;
    let uptime = relay.uptime().as_secs();

    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let registrations = m.registrations_total.load(Ordering::Relaxed);
    let relayed = m.messages_relayed.load(Ordering::Relaxed);
    let queued = m.messages_queued.load(Ordering::Relaxed);
    let drained = m.messages_drained.load(Ordering::Relaxed);
    let acks = m.acks_total.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    format!(
        r#"# HELP chat_relay_peers_active Number of registered peers
# TYPE chat_relay_peers_active gauge
chat_relay_peers_active {peers}

# HELP chat_relay_pending_messages Messages waiting for offline recipients
# TYPE chat_relay_pending_messages gauge
chat_relay_pending_messages {pending}

# HELP chat_relay_pending_recipients Offline phones with waiting messages
# TYPE chat_relay_pending_recipients gauge
chat_relay_pending_recipients {recipients}

# HELP chat_relay_info Server information
# TYPE chat_relay_info gauge
chat_relay_info{{version="{version}"}} 1

# HELP chat_relay_uptime_seconds Seconds since startup
# TYPE chat_relay_uptime_seconds gauge
chat_relay_uptime_seconds {uptime}

# HELP chat_relay_connections_total Total WebSocket connections accepted
# TYPE chat_relay_connections_total counter
chat_relay_connections_total {conns_total}

# HELP chat_relay_registrations_total Total successful registrations
# TYPE chat_relay_registrations_total counter
chat_relay_registrations_total {registrations}

# HELP chat_relay_messages_relayed_total Messages pushed to a live recipient
# TYPE chat_relay_messages_relayed_total counter
chat_relay_messages_relayed_total {relayed}

# HELP chat_relay_messages_queued_total Messages queued for an offline recipient
# TYPE chat_relay_messages_queued_total counter
chat_relay_messages_queued_total {queued}

# HELP chat_relay_messages_drained_total Queued messages delivered on registration
# TYPE chat_relay_messages_drained_total counter
chat_relay_messages_drained_total {drained}

# HELP chat_relay_acks_total Acks sent to senders
# TYPE chat_relay_acks_total counter
chat_relay_acks_total {acks}

# HELP chat_relay_errors_total Envelopes answered with an error
# TYPE chat_relay_errors_total counter
chat_relay_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
