//! Delete a conversation or a single message.

use anyhow::Result;
use std::path::Path;

use chat_types::MessageId;

use super::{parse_phone, Profile};

/// Run the delete command.
///
/// Media files referenced by deleted messages are removed too.
pub async fn run(data_dir: &Path, peer: &str, message: Option<&str>) -> Result<()> {
    let profile = Profile::open(data_dir).await?;
    let peer = parse_phone(peer)?;
    let id = profile.router.conversation_with(&peer);

    match message {
        Some(message_id) => {
            let message_id = MessageId::from(message_id);
            if !profile.router.delete_message(&id, &message_id).await? {
                anyhow::bail!("No message {message_id} in conversation with {peer}");
            }
            println!("Deleted message {message_id}");
        }
        None => {
            profile.router.delete_conversation(&id).await?;
            println!("Deleted conversation with {peer}");
        }
    }
    Ok(())
}
