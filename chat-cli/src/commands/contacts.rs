//! List contacts.

use anyhow::Result;
use std::path::Path;

use chat_store::ContactBook;

/// Run the contacts command.
pub async fn run(data_dir: &Path) -> Result<()> {
    let contacts = ContactBook::new(data_dir).load().await;
    if contacts.is_empty() {
        println!("No contacts");
        return Ok(());
    }
    for (phone, name) in &contacts {
        println!("{phone}  {name}");
    }
    Ok(())
}
