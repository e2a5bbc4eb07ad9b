//! CLI command implementations.

pub mod contact;
pub mod contacts;
pub mod conversations;
pub mod delete;
pub mod history;
pub mod init;
pub mod listen;
pub mod send;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use chat_client::{ClientEvent, DeliveryRouter};
use chat_store::{
    ContactBook, ConversationStore, Direction, LocalConfig, MediaStore, Message, StorageCipher,
};
use chat_types::{ContentType, PhoneNumber};
use tracing::debug;

/// Everything a command needs from an initialized data directory.
pub struct Profile {
    pub config: LocalConfig,
    pub me: PhoneNumber,
    pub store: Arc<ConversationStore>,
    pub router: DeliveryRouter,
    pub contacts: ContactBook,
}

impl Profile {
    /// Open the profile under `data_dir`. Fails if `init` has not run.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let config = LocalConfig::load(data_dir).await.with_context(|| {
            format!(
                "Not initialized. Run 'chat-cli init --phone <number>' first ({} missing or invalid)",
                LocalConfig::path(data_dir).display()
            )
        })?;
        let me = parse_phone(&config.phone_number)?;

        let store = Arc::new(ConversationStore::new(
            data_dir,
            Arc::new(StorageCipher::default()),
        ));
        let router = DeliveryRouter::new(me.clone(), store.clone(), MediaStore::new(data_dir));

        Ok(Self {
            config,
            me,
            store,
            router,
            contacts: ContactBook::new(data_dir),
        })
    }

    /// Store a delivered message and print it. Other events are ignored.
    pub async fn persist_event(&self, event: &ClientEvent) -> Result<()> {
        let ClientEvent::Message(envelope) = event else {
            return Ok(());
        };
        let Some((id, message)) = self.router.handle_incoming(envelope).await? else {
            debug!(id = %envelope.id, "Delivered message was dropped");
            return Ok(());
        };
        debug!(conversation = %id, id = %message.id, "Stored delivered message");
        let peer = id.peer_of(&self.me);
        let sender = match (&message.direction, peer) {
            (Direction::Remote, Some(peer)) => self.contacts.display_name(&peer).await,
            _ => "me".to_string(),
        };
        println!("{sender}: {}", describe(&message));
        Ok(())
    }
}

/// Normalize a phone argument.
pub fn parse_phone(raw: &str) -> Result<PhoneNumber> {
    PhoneNumber::normalize(raw).with_context(|| format!("Invalid phone number: {raw:?}"))
}

/// One-line rendering of a stored message.
pub fn describe(message: &Message) -> String {
    match message.content_type {
        ContentType::Text => message.content.clone(),
        ContentType::Image => format!("[image] {}", message.content),
        ContentType::Audio => format!("[audio] {}", message.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::{DeliveryEnvelope, MessageId};
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_requires_init() {
        let dir = tempdir().unwrap();
        let err = Profile::open(dir.path()).await.err().unwrap();
        assert!(err.to_string().contains("Not initialized"));
    }

    #[tokio::test]
    async fn persist_event_stores_messages_only() {
        let dir = tempdir().unwrap();
        LocalConfig::new("+1111").save(dir.path()).await.unwrap();
        let profile = Profile::open(dir.path()).await.unwrap();

        profile
            .persist_event(&ClientEvent::Connected)
            .await
            .unwrap();
        profile
            .persist_event(&ClientEvent::Message(DeliveryEnvelope {
                id: MessageId::from("msg_1_a"),
                from: "+2222".into(),
                to: "+1111".into(),
                content: "hello".into(),
                content_type: ContentType::Text,
                timestamp: "2026-01-01T00:00:00.000Z".into(),
            }))
            .await
            .unwrap();

        let peer = parse_phone("+2222").unwrap();
        let conversation = profile
            .store
            .load(&profile.router.conversation_with(&peer))
            .await
            .unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.unread_count, 1);
    }

    #[test]
    fn describe_marks_media() {
        let msg = Message::new(
            MessageId::from("x"),
            Direction::Remote,
            "media/img/img_00000000.jpg",
            ContentType::Image,
        );
        assert_eq!(describe(&msg), "[image] media/img/img_00000000.jpg");
    }
}
