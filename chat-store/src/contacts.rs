//! Phone to display-name map stored as `contacts.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chat_types::PhoneNumber;
use tracing::warn;

use crate::error::Result;

const CONTACTS_FILE: &str = "contacts.json";

/// Contact names keyed by phone.
///
/// Small enough to be read and rewritten whole on every change.
#[derive(Debug, Clone)]
pub struct ContactBook {
    path: PathBuf,
}

impl ContactBook {
    /// Contact book under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(CONTACTS_FILE),
        }
    }

    /// All contacts. A missing or unreadable file yields an empty map.
    pub async fn load(&self) -> BTreeMap<PhoneNumber, String> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read contacts");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid contacts file");
            BTreeMap::new()
        })
    }

    /// Set the display name for `phone` (trimmed).
    ///
    /// A blank name removes the contact.
    pub async fn save_name(&self, phone: &PhoneNumber, name: &str) -> Result<()> {
        let mut contacts = self.load().await;
        let name = name.trim();
        if name.is_empty() {
            contacts.remove(phone);
        } else {
            contacts.insert(phone.clone(), name.to_string());
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(&contacts)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }

    /// Display name for `phone`, if known.
    pub async fn name_of(&self, phone: &PhoneNumber) -> Option<String> {
        self.load().await.remove(phone)
    }

    /// Display name for `phone`, falling back to the phone itself.
    pub async fn display_name(&self, phone: &PhoneNumber) -> String {
        self.name_of(phone)
            .await
            .unwrap_or_else(|| phone.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::normalize(raw).unwrap()
    }

    #[tokio::test]
    async fn empty_book() {
        let dir = TempDir::new().unwrap();
        let book = ContactBook::new(dir.path());
        assert!(book.load().await.is_empty());
        assert_eq!(book.name_of(&phone("+1111")).await, None);
    }

    #[tokio::test]
    async fn save_trims_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let book = ContactBook::new(dir.path());

        book.save_name(&phone("+1111"), "  Ana  ").await.unwrap();
        assert_eq!(book.name_of(&phone("+1111")).await.as_deref(), Some("Ana"));

        book.save_name(&phone("+1111"), "Ana María").await.unwrap();
        assert_eq!(book.load().await.len(), 1);
        assert_eq!(book.display_name(&phone("+1111")).await, "Ana María");
    }

    #[tokio::test]
    async fn blank_name_removes_contact() {
        let dir = TempDir::new().unwrap();
        let book = ContactBook::new(dir.path());
        book.save_name(&phone("+1111"), "Ana").await.unwrap();
        book.save_name(&phone("+1111"), "   ").await.unwrap();

        assert_eq!(book.display_name(&phone("+1111")).await, "+1111");
    }

    #[tokio::test]
    async fn file_is_plain_phone_to_name_map() {
        let dir = TempDir::new().unwrap();
        let book = ContactBook::new(dir.path());
        book.save_name(&phone("+2222"), "Bo").await.unwrap();

        let raw = tokio::fs::read_to_string(dir.path().join(CONTACTS_FILE))
            .await
            .unwrap();
        let map: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(map.get("+2222").map(String::as_str), Some("Bo"));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(CONTACTS_FILE), "{not json")
            .await
            .unwrap();
        assert!(ContactBook::new(dir.path()).load().await.is_empty());
    }
}
