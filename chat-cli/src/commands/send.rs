//! Send one message to a peer.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use chat_client::{ClientConnection, ClientEvent, WsTransport};
use chat_store::encode_attachment;
use chat_types::ContentType;

use super::{parse_phone, Profile};

const REGISTER_TIMEOUT: Duration = Duration::from_secs(10);
const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// What to send.
#[derive(Debug)]
pub enum Outgoing {
    Text(String),
    Image(PathBuf),
    Audio(PathBuf),
}

impl Outgoing {
    /// Wire content and content type.
    async fn into_wire(self) -> Result<(String, ContentType)> {
        match self {
            Outgoing::Text(text) => Ok((text, ContentType::Text)),
            Outgoing::Image(path) => Ok((read_attachment(&path).await?, ContentType::Image)),
            Outgoing::Audio(path) => Ok((read_attachment(&path).await?, ContentType::Audio)),
        }
    }
}

async fn read_attachment(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(encode_attachment(&bytes))
}

/// Run the send command.
pub async fn run(data_dir: &Path, peer: &str, outgoing: Outgoing) -> Result<()> {
    let profile = Profile::open(data_dir).await?;
    let peer = parse_phone(peer)?;
    let (content, content_type) = outgoing.into_wire().await?;

    let (client, mut events) = ClientConnection::new(WsTransport::new());
    println!("Connecting to {}...", profile.config.signaling_server_url);
    debug!(url = %profile.config.signaling_server_url, me = %profile.me, "Connecting");
    client
        .connect(&profile.config.signaling_server_url, profile.me.as_str())
        .await
        .context("Failed to connect to relay")?;

    wait_for(&profile, &mut events, REGISTER_TIMEOUT, |e| {
        matches!(e, ClientEvent::Registered { .. })
    })
    .await
    .context("Relay did not confirm registration")?;

    let (conversation, local) = profile
        .router
        .record_outgoing(&peer, content_type, &content)
        .await?;
    client.send(&peer, &content, content_type).await?;
    debug!(to = %peer, local_id = %local.id, content_type = content_type.as_str(), "Message handed to relay");

    match wait_for(&profile, &mut events, ACK_TIMEOUT, |e| {
        matches!(e, ClientEvent::Ack { .. })
    })
    .await
    {
        Ok(ClientEvent::Ack { id, timestamp }) => {
            println!("Message sent!");
            println!("  Conversation: {conversation}");
            println!("  Local id:     {}", local.id);
            println!("  Relay id:     {id}");
            println!("  Accepted at:  {timestamp}");
        }
        Ok(_) => {}
        Err(e) => {
            warn!(local_id = %local.id, error = %e, "No ack from relay");
            println!("Message handed to relay, no ack received (kept locally as {})", local.id);
        }
    }

    client.disconnect().await?;
    drain_remaining(&profile, &mut events).await
}

/// Store messages that were already delivered when the session ended.
pub(crate) async fn drain_remaining(
    profile: &Profile,
    events: &mut UnboundedReceiver<ClientEvent>,
) -> Result<()> {
    let mut stored = 0usize;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ClientEvent::Message(_)) {
            stored += 1;
        }
        profile.persist_event(&event).await?;
    }
    if stored > 0 {
        debug!(stored, "Stored messages delivered after the ack");
    }
    Ok(())
}

/// Pump events until `done` matches one, storing any delivered messages on
/// the way.
pub(crate) async fn wait_for<F>(
    profile: &Profile,
    events: &mut UnboundedReceiver<ClientEvent>,
    limit: Duration,
    done: F,
) -> Result<ClientEvent>
where
    F: Fn(&ClientEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .context("Timed out")?
            .context("Connection closed")?;

        if done(&event) {
            return Ok(event);
        }
        match &event {
            ClientEvent::Disconnected { reason } => anyhow::bail!("Disconnected: {reason}"),
            ClientEvent::Error { code, msg } => {
                warn!(code = ?code, %msg, "Relay reported an error");
                eprintln!("Relay error: {msg}");
            }
            _ => profile.persist_event(&event).await?,
        }
    }
}
