//! chat-relay binary entry point.
//!
//! Usage:
//! ```bash
//! chat-relay --config relay.toml
//! PORT=8080 chat-relay
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use relaychat_relay::{ChatRelay, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = get_config_path();
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?
        .with_port_override(std::env::var("PORT").ok().as_deref())?;

    let relay = Arc::new(ChatRelay::new(config));
    let listener = relaychat_relay::bind(&relay)
        .await
        .with_context(|| format!("binding {}", relay.config().server.bind_address))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %listener.local_addr()?,
        "chat-relay listening"
    );

    relaychat_relay::serve(relay, listener, shutdown_signal()).await?;

    tracing::info!("chat-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relay.toml"))
}
