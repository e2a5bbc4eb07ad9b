//! Files delivered and sent messages into the local conversation store.
//!
//! The router owns the "which conversation is on screen" marker. A message
//! delivered into any other conversation bumps its unread count; opening a
//! conversation resets it.

use std::sync::Arc;

use chat_store::{ConversationStore, Direction, MediaStore, Message, StorageError};
use chat_types::{ContentType, ConversationId, DeliveryEnvelope, MessageId, PhoneNumber};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Routes messages between the connection and the store.
pub struct DeliveryRouter {
    me: PhoneNumber,
    store: Arc<ConversationStore>,
    media: MediaStore,
    active: Mutex<Option<ConversationId>>,
}

impl DeliveryRouter {
    /// Router for the local phone `me`.
    pub fn new(me: PhoneNumber, store: Arc<ConversationStore>, media: MediaStore) -> Self {
        Self {
            me,
            store,
            media,
            active: Mutex::new(None),
        }
    }

    /// The local phone.
    pub fn me(&self) -> &PhoneNumber {
        &self.me
    }

    /// Conversation id shared with `peer`.
    pub fn conversation_with(&self, peer: &PhoneNumber) -> ConversationId {
        ConversationId::derive(&self.me, peer)
    }

    /// Store a delivered envelope.
    ///
    /// Returns `None` when the envelope was dropped: unusable phones, or an
    /// attachment that is not valid base64.
    pub async fn handle_incoming(
        &self,
        envelope: &DeliveryEnvelope,
    ) -> Result<Option<(ConversationId, Message)>, StorageError> {
        let (Some(from), Some(to)) = (
            PhoneNumber::normalize(&envelope.from),
            PhoneNumber::normalize(&envelope.to),
        ) else {
            warn!(id = %envelope.id, "Dropping message with unusable phone numbers");
            return Ok(None);
        };

        let (peer, direction) = if from == self.me {
            (to, Direction::Local)
        } else {
            (from, Direction::Remote)
        };
        let id = self.conversation_with(&peer);

        let content = match self
            .media
            .store_inbound(envelope.content_type, &envelope.content)
            .await
        {
            Ok(content) => content,
            Err(StorageError::InvalidAttachment(e)) => {
                warn!(id = %envelope.id, error = %e, "Dropping attachment with invalid encoding");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let message = Message::new(envelope.id.clone(), direction, content, envelope.content_type);
        let count_unread = !self.is_active(&id).await;
        self.store
            .append_incoming(&id, message.clone(), count_unread)
            .await?;

        debug!(conversation = %id, id = %envelope.id, "Stored delivered message");
        Ok(Some((id, message)))
    }

    /// Store a message we are about to send, under a `local_` id.
    ///
    /// `content` is what goes on the wire: text, or base64 for attachments.
    pub async fn record_outgoing(
        &self,
        peer: &PhoneNumber,
        content_type: ContentType,
        content: &str,
    ) -> Result<(ConversationId, Message), StorageError> {
        let id = self.conversation_with(peer);
        let stored = self.media.store_inbound(content_type, content).await?;
        let message = Message::new(MessageId::local(), Direction::Local, stored, content_type);
        self.store.append(&id, message.clone()).await?;
        Ok((id, message))
    }

    /// Mark `id` as the conversation on screen (or none), resetting its
    /// unread count.
    pub async fn set_active(&self, id: Option<ConversationId>) -> Result<(), StorageError> {
        *self.active.lock().await = id.clone();
        if let Some(id) = id {
            self.store.mark_read(&id).await?;
        }
        Ok(())
    }

    /// Delete one message and its media file. Returns whether it existed.
    pub async fn delete_message(
        &self,
        id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<bool, StorageError> {
        let Some(removed) = self.store.remove(id, message_id).await? else {
            return Ok(false);
        };
        if removed.content_type.is_media() {
            self.media.delete(&removed.content).await;
        }
        Ok(true)
    }

    /// Delete a conversation and every media file it references.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), StorageError> {
        if let Some(conversation) = self.store.load(id).await {
            for message in conversation.messages.iter().filter(|m| m.content_type.is_media()) {
                self.media.delete(&message.content).await;
            }
        }
        self.store.delete(id).await
    }

    async fn is_active(&self, id: &ConversationId) -> bool {
        self.active.lock().await.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_store::{encode_attachment, StorageCipher};
    use tempfile::TempDir;

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::normalize(raw).unwrap()
    }

    fn setup() -> (TempDir, DeliveryRouter, Arc<ConversationStore>, MediaStore) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ConversationStore::new(
            dir.path(),
            Arc::new(StorageCipher::default()),
        ));
        let media = MediaStore::new(dir.path());
        let router = DeliveryRouter::new(phone("+1111"), store.clone(), media.clone());
        (dir, router, store, media)
    }

    fn envelope(id: &str, from: &str, content: &str, content_type: ContentType) -> DeliveryEnvelope {
        DeliveryEnvelope {
            id: MessageId::from(id),
            from: from.into(),
            to: "+1111".into(),
            content: content.into(),
            content_type,
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    // ===========================================
    // Incoming Tests
    // ===========================================

    #[tokio::test]
    async fn incoming_text_lands_in_derived_conversation() {
        let (_dir, router, store, _media) = setup();

        let (id, message) = router
            .handle_incoming(&envelope("msg_1_a", "+2222", "hi", ContentType::Text))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(id.as_str(), "p2p_+1111_+2222");
        assert_eq!(message.direction, Direction::Remote);
        let conversation = store.load(&id).await.unwrap();
        assert_eq!(conversation.messages, vec![message]);
        assert_eq!(conversation.unread_count, 1);
    }

    #[tokio::test]
    async fn active_conversation_does_not_count_unread() {
        let (_dir, router, store, _media) = setup();
        let id = router.conversation_with(&phone("+2222"));
        router.set_active(Some(id.clone())).await.unwrap();

        router
            .handle_incoming(&envelope("msg_1_a", "+2222", "hi", ContentType::Text))
            .await
            .unwrap();

        assert_eq!(store.load(&id).await.unwrap().unread_count, 0);
    }

    #[tokio::test]
    async fn opening_conversation_resets_unread() {
        let (_dir, router, store, _media) = setup();
        for i in 0..3 {
            router
                .handle_incoming(&envelope(&format!("msg_{i}"), "+2222", "x", ContentType::Text))
                .await
                .unwrap();
        }
        let id = router.conversation_with(&phone("+2222"));
        assert_eq!(store.load(&id).await.unwrap().unread_count, 3);

        router.set_active(Some(id.clone())).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap().unread_count, 0);
    }

    #[tokio::test]
    async fn incoming_image_is_stored_as_relative_path() {
        let (_dir, router, _store, media) = setup();
        let payload = encode_attachment(b"jpeg bytes");

        let (_, message) = router
            .handle_incoming(&envelope("msg_1", "+2222", &payload, ContentType::Image))
            .await
            .unwrap()
            .unwrap();

        assert!(message.content.starts_with("media/img/"));
        assert!(media.exists(&message.content).await);
    }

    #[tokio::test]
    async fn invalid_attachment_is_dropped() {
        let (_dir, router, store, _media) = setup();

        let result = router
            .handle_incoming(&envelope("msg_1", "+2222", "!!!", ContentType::Audio))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    // ===========================================
    // Outgoing / Delete Tests
    // ===========================================

    #[tokio::test]
    async fn outgoing_uses_local_id_and_no_unread() {
        let (_dir, router, store, _media) = setup();

        let (id, message) = router
            .record_outgoing(&phone("+2222"), ContentType::Text, "hello")
            .await
            .unwrap();

        assert!(message.id.is_local());
        assert_eq!(message.direction, Direction::Local);
        let conversation = store.load(&id).await.unwrap();
        assert_eq!(conversation.unread_count, 0);
        assert_eq!(conversation.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn both_directions_share_one_conversation() {
        let (_dir, router, store, _media) = setup();

        router
            .record_outgoing(&phone("+2222"), ContentType::Text, "ping")
            .await
            .unwrap();
        let (id, _) = router
            .handle_incoming(&envelope("msg_1", "+2222", "pong", ContentType::Text))
            .await
            .unwrap()
            .unwrap();

        let contents: Vec<_> = store
            .load(&id)
            .await
            .unwrap()
            .messages
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["ping", "pong"]);
    }

    #[tokio::test]
    async fn deleting_media_message_deletes_file() {
        let (_dir, router, _store, media) = setup();
        let (id, message) = router
            .record_outgoing(&phone("+2222"), ContentType::Audio, &encode_attachment(b"m4a"))
            .await
            .unwrap();
        assert!(media.exists(&message.content).await);

        assert!(router.delete_message(&id, &message.id).await.unwrap());
        assert!(!media.exists(&message.content).await);
        assert!(!router.delete_message(&id, &message.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_conversation_removes_everything() {
        let (_dir, router, store, media) = setup();
        let (id, image) = router
            .record_outgoing(&phone("+2222"), ContentType::Image, &encode_attachment(b"img"))
            .await
            .unwrap();

        router.delete_conversation(&id).await.unwrap();

        assert!(store.load(&id).await.is_none());
        assert!(!media.exists(&image.content).await);
    }
}
