//! HTTP endpoints for chat-relay.
//!
//! The WebSocket upgrade lives at `/`; health and metrics sit beside it.

pub mod health;
mod metrics;

use crate::server::ChatRelay;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the router with all endpoints.
pub fn build_router(relay: Arc<ChatRelay>) -> Router {
    let mut router = Router::new()
        .route("/", get(crate::ws::ws_handler))
        .route("/health", get(health::health_handler));

    if relay.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router.layer(Extension(relay))
}
