//! Name a phone number.

use anyhow::Result;
use std::path::Path;

use chat_store::ContactBook;

use super::parse_phone;

/// Run the contact command. A blank name removes the contact.
pub async fn run(data_dir: &Path, phone: &str, name: &str) -> Result<()> {
    let phone = parse_phone(phone)?;
    ContactBook::new(data_dir).save_name(&phone, name).await?;

    if name.trim().is_empty() {
        println!("Removed contact {phone}");
    } else {
        println!("Saved contact {phone} as {}", name.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn contact_saves_under_normalized_phone() {
        let dir = tempdir().unwrap();
        run(dir.path(), "34 600 000 002", "  Bob ").await.unwrap();

        let phone = parse_phone("+34600000002").unwrap();
        let book = ContactBook::new(dir.path());
        assert_eq!(book.name_of(&phone).await.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn blank_name_removes_contact() {
        let dir = tempdir().unwrap();
        run(dir.path(), "+2222", "Bob").await.unwrap();
        run(dir.path(), "+2222", " ").await.unwrap();

        let book = ContactBook::new(dir.path());
        assert!(book.load().await.is_empty());
    }
}
