//! Receive messages until interrupted.

use anyhow::{Context, Result};
use std::path::Path;

use chat_client::{ClientConnection, ClientEvent, WsTransport};
use tracing::{info, warn};

use super::Profile;

/// Run the listen command.
pub async fn run(data_dir: &Path) -> Result<()> {
    let profile = Profile::open(data_dir).await?;

    let (client, mut events) = ClientConnection::new(WsTransport::new());
    client
        .connect(&profile.config.signaling_server_url, profile.me.as_str())
        .await
        .context("Failed to connect to relay")?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match &event {
                    ClientEvent::Registered { phone } => {
                        info!(%phone, "Registered, listening");
                        println!("Listening as {phone} (Ctrl-C to stop)");
                    }
                    ClientEvent::Disconnected { reason } => {
                        warn!(%reason, "Relay connection lost");
                        println!("Disconnected: {reason}");
                        break;
                    }
                    ClientEvent::Error { code, msg } => {
                        warn!(code = ?code, %msg, "Relay reported an error");
                        eprintln!("Relay error: {msg}");
                    }
                    _ => profile.persist_event(&event).await?,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting");
                client.disconnect().await?;
                super::send::drain_remaining(&profile, &mut events).await?;
                break;
            }
        }
    }

    Ok(())
}
