//! Print one conversation.

use anyhow::Result;
use std::path::Path;

use chat_store::Direction;

use super::{describe, parse_phone, Profile};

/// Run the history command.
///
/// Opening a conversation resets its unread count.
pub async fn run(data_dir: &Path, peer: &str) -> Result<()> {
    let profile = Profile::open(data_dir).await?;
    let peer = parse_phone(peer)?;
    let id = profile.router.conversation_with(&peer);

    profile.router.set_active(Some(id.clone())).await?;

    let Some(conversation) = profile.store.load(&id).await else {
        println!("No messages with {peer}");
        return Ok(());
    };

    let peer_name = profile.contacts.display_name(&peer).await;
    println!("Conversation with {peer_name} ({id})");
    println!();
    for message in &conversation.messages {
        let sender = match message.direction {
            Direction::Local => "me",
            Direction::Remote => peer_name.as_str(),
            Direction::System => "*",
        };
        println!("  [{}] {sender}: {}", message.id, describe(message));
    }

    Ok(())
}
