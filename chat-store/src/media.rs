//! Attachment codec and local media files.
//!
//! On the wire an attachment is base64 text in a message's `content`. Once
//! stored, the message content is a path relative to the data directory,
//! e.g. `media/img/img_1a2b3c4d.jpg`.

use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use chat_types::ContentType;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

const MEDIA_DIR: &str = "media";

/// Encode attachment bytes for a `message` envelope.
pub fn encode_attachment(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode attachment bytes from a `message` envelope.
pub fn decode_attachment(content: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(content.trim())?)
}

/// Media files under `<root>/media/{img,audio}`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Media store under the data directory `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Turn an inbound `content` into what gets stored.
    ///
    /// Text passes through. Image and audio payloads are decoded and written
    /// to a new file; the relative path is returned. Invalid base64 is an
    /// error so the caller can drop the message.
    pub async fn store_inbound(&self, content_type: ContentType, content: &str) -> Result<String> {
        if !content_type.is_media() {
            return Ok(content.to_string());
        }
        let bytes = decode_attachment(content)?;
        Ok(self.save(content_type, &bytes).await)
    }

    /// Write attachment bytes to a freshly named file.
    ///
    /// Best-effort: a failed write is logged and the path is still returned.
    pub async fn save(&self, content_type: ContentType, bytes: &[u8]) -> String {
        let (subdir, prefix, ext) = match content_type {
            ContentType::Audio => ("audio", "audio", "m4a"),
            _ => ("img", "img", "jpg"),
        };
        let short = Uuid::new_v4().simple().to_string();
        let name = format!("{prefix}_{}.{ext}", &short[..8]);
        let relative = format!("{MEDIA_DIR}/{subdir}/{name}");

        let dir = self.root.join(MEDIA_DIR).join(subdir);
        let written = match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => tokio::fs::write(dir.join(&name), bytes).await,
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => debug!(path = %relative, size = bytes.len(), "Saved media file"),
            Err(e) => warn!(path = %relative, error = %e, "Failed to save media file"),
        }

        relative
    }

    /// Absolute path for a stored relative path.
    ///
    /// `None` if the path is absolute or escapes the data directory.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Whether the file behind `relative` exists.
    pub async fn exists(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Delete the file behind `relative`. Best-effort.
    pub async fn delete(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %relative, error = %e, "Failed to delete media file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use tempfile::TempDir;

    #[test]
    fn attachment_codec() {
        let bytes = [0u8, 1, 2, 250, 255];
        let encoded = encode_attachment(&bytes);
        assert_eq!(decode_attachment(&encoded).unwrap(), bytes);
    }

    #[test]
    fn invalid_base64_is_error() {
        assert!(matches!(
            decode_attachment("***not base64***"),
            Err(StorageError::InvalidAttachment(_))
        ));
    }

    #[tokio::test]
    async fn text_is_stored_verbatim() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());
        let stored = media.store_inbound(ContentType::Text, "hola").await.unwrap();
        assert_eq!(stored, "hola");
    }

    #[tokio::test]
    async fn image_is_written_under_img() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());
        let payload = encode_attachment(b"\xff\xd8\xff fake jpeg");

        let relative = media.store_inbound(ContentType::Image, &payload).await.unwrap();

        assert!(relative.starts_with("media/img/img_"));
        assert!(relative.ends_with(".jpg"));
        let path = media.resolve(&relative).unwrap();
        assert_eq!(tokio::fs::read(path).await.unwrap(), b"\xff\xd8\xff fake jpeg");
    }

    #[tokio::test]
    async fn audio_is_written_under_audio() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());

        let relative = media.save(ContentType::Audio, b"m4a bytes").await;

        assert!(relative.starts_with("media/audio/audio_"));
        assert!(relative.ends_with(".m4a"));
        assert!(media.exists(&relative).await);
    }

    #[tokio::test]
    async fn bad_payload_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());

        assert!(media.store_inbound(ContentType::Audio, "%%%").await.is_err());
        assert!(!dir.path().join(MEDIA_DIR).exists());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path());
        let relative = media.save(ContentType::Image, b"x").await;

        media.delete(&relative).await;
        assert!(!media.exists(&relative).await);
        // Second delete is silent.
        media.delete(&relative).await;
    }

    #[test]
    fn resolve_rejects_escapes() {
        let media = MediaStore::new("/data");
        assert!(media.resolve("../etc/passwd").is_none());
        assert!(media.resolve("/etc/passwd").is_none());
        assert_eq!(
            media.resolve("media/img/a.jpg"),
            Some(PathBuf::from("/data/media/img/a.jpg"))
        );
    }
}
