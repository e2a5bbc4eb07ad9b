//! List local conversations.

use anyhow::Result;
use std::path::Path;

use super::{describe, Profile};

/// Run the conversations command.
pub async fn run(data_dir: &Path) -> Result<()> {
    let profile = Profile::open(data_dir).await?;
    let conversations = profile.store.list().await?;

    if conversations.is_empty() {
        println!("No conversations yet");
        return Ok(());
    }

    for conversation in &conversations {
        let title = match conversation.id.peer_of(&profile.me) {
            Some(peer) => profile.contacts.display_name(&peer).await,
            None => conversation.id.to_string(),
        };
        let unread = match conversation.unread_count {
            0 => String::new(),
            n => format!(" ({n} unread)"),
        };
        let preview = conversation
            .last_message()
            .map(describe)
            .unwrap_or_default();
        println!("{title}{unread}");
        println!("  {preview}");
    }

    Ok(())
}
