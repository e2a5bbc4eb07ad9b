//! Encrypted, file-per-conversation store.
//!
//! Each conversation lives in `<root>/conversations/<id>.dat` as the
//! encrypted JSON of a [`Conversation`]. Every mutation reloads the file,
//! edits it in memory and rewrites it whole (write to a temp file, then
//! rename).
//!
//! Mutations on one conversation id are serialized by an async lock per id,
//! so a racing inbound append and a local append cannot drop each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chat_types::{ContentType, ConversationId, MessageId};
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::crypto::StorageCipher;
use crate::error::Result;

const CONVERSATIONS_DIR: &str = "conversations";
const FILE_EXTENSION: &str = "dat";

/// Who produced a message, from the local user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the local user.
    Local,
    /// Received from the peer.
    Remote,
    /// Generated locally (notices, banners).
    System,
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Relay-assigned or `local_` id.
    pub id: MessageId,
    /// Who produced it.
    pub direction: Direction,
    /// Text, or a media path relative to the data directory.
    pub content: String,
    /// Kind of content.
    #[serde(default)]
    pub content_type: ContentType,
    /// Suggested replies shown with the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<String>>,
}

impl Message {
    /// A message with no quick replies.
    pub fn new(
        id: MessageId,
        direction: Direction,
        content: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        Self {
            id,
            direction,
            content: content.into(),
            content_type,
            quick_replies: None,
        }
    }
}

/// A stored two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Derived conversation id.
    pub id: ConversationId,
    /// Messages in append order.
    pub messages: Vec<Message>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Carried through unchanged.
    #[serde(default)]
    pub escalated: bool,
    /// Messages received while the conversation was not active.
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// An empty conversation created now.
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            escalated: false,
            unread_count: 0,
        }
    }

    /// The most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Encrypted conversation persistence rooted at a data directory.
pub struct ConversationStore {
    dir: PathBuf,
    cipher: Arc<StorageCipher>,
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl ConversationStore {
    /// Open a store under `root` (the directory is created lazily).
    pub fn new(root: impl AsRef<Path>, cipher: Arc<StorageCipher>) -> Self {
        Self {
            dir: root.as_ref().join(CONVERSATIONS_DIR),
            cipher,
            locks: DashMap::new(),
        }
    }

    /// Path of the file backing `id`.
    pub fn path_for(&self, id: &ConversationId) -> PathBuf {
        self.dir.join(format!("{}.{FILE_EXTENSION}", id.as_str()))
    }

    /// Load a conversation.
    ///
    /// A missing file, a decrypt failure or a parse failure all yield
    /// `None`; failures other than "missing" are logged.
    pub async fn load(&self, id: &ConversationId) -> Option<Conversation> {
        self.read_file(&self.path_for(id)).await
    }

    /// Append `message`, creating the conversation on first use.
    ///
    /// Does not touch the unread count.
    pub async fn append(&self, id: &ConversationId, message: Message) -> Result<Conversation> {
        self.append_incoming(id, message, false).await
    }

    /// Append `message` and, when `count_unread` is set, bump the unread count.
    ///
    /// A message whose id is already stored is ignored, so a redelivered
    /// envelope does not show up twice.
    pub async fn append_incoming(
        &self,
        id: &ConversationId,
        message: Message,
        count_unread: bool,
    ) -> Result<Conversation> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut conversation = self
            .load(id)
            .await
            .unwrap_or_else(|| Conversation::new(id.clone()));
        if conversation.messages.iter().any(|m| m.id == message.id) {
            debug!(conversation = %id, message = %message.id, "Skipping duplicate message");
            return Ok(conversation);
        }
        conversation.messages.push(message);
        if count_unread {
            conversation.unread_count = conversation.unread_count.saturating_add(1);
        }
        self.write(&conversation).await?;

        debug!(conversation = %id, messages = conversation.messages.len(), "Appended message");
        Ok(conversation)
    }

    /// Remove one message, returning it (`None` if it was not found).
    ///
    /// The removed message lets callers clean up its media file.
    pub async fn remove(
        &self,
        id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<Option<Message>> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let Some(mut conversation) = self.load(id).await else {
            return Ok(None);
        };
        let Some(index) = conversation.messages.iter().position(|m| &m.id == message_id) else {
            return Ok(None);
        };
        let removed = conversation.messages.remove(index);
        self.write(&conversation).await?;
        Ok(Some(removed))
    }

    /// Reset the unread count to zero.
    ///
    /// Returns `false` if the conversation does not exist.
    pub async fn mark_read(&self, id: &ConversationId) -> Result<bool> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let Some(mut conversation) = self.load(id).await else {
            return Ok(false);
        };
        if conversation.unread_count != 0 {
            conversation.unread_count = 0;
            self.write(&conversation).await?;
        }
        Ok(true)
    }

    /// Delete the conversation file. Missing files are not an error.
    pub async fn delete(&self, id: &ConversationId) -> Result<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let removed = match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        };

        // Drop the lock entry unless another task is already waiting on it
        // (one reference in the map, one held here).
        self.locks
            .remove_if(id, |_, entry| Arc::strong_count(entry) <= 2);
        removed
    }

    /// All decodable conversations, newest `createdAt` first.
    pub async fn list(&self) -> Result<Vec<Conversation>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut conversations = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str());
            if stem.and_then(ConversationId::parse).is_none() {
                debug!(path = %path.display(), "Skipping file with a non-canonical name");
                continue;
            }
            if let Some(conversation) = self.read_file(&path).await {
                conversations.push(conversation);
            }
        }

        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    async fn read_file(&self, path: &Path) -> Option<Conversation> {
        let stored = match tokio::fs::read_to_string(path).await {
            Ok(stored) => stored,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read conversation");
                return None;
            }
        };

        let json = match self.cipher.decrypt(&stored) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decrypt conversation");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(conversation) => Some(conversation),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse conversation");
                None
            }
        }
    }

    async fn write(&self, conversation: &Conversation) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_string(conversation)?;
        let stored = self.cipher.encrypt(&json);

        let path = self.path_for(&conversation.id);
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
        tokio::fs::write(&tmp, stored).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn lock_for(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
