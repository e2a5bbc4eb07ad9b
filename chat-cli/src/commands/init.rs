//! Store this device's identity.

use anyhow::Result;
use std::path::Path;

use chat_store::LocalConfig;

use super::parse_phone;

/// Run the init command.
///
/// Re-running overwrites the previous settings; conversations are kept.
pub async fn run(
    data_dir: &Path,
    phone: &str,
    server: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let phone = parse_phone(phone)?;

    let mut config = LocalConfig::new(phone.as_str());
    if let Some(server) = server {
        config.signaling_server_url = server.to_string();
    }
    config.user_name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    config.save(data_dir).await?;

    println!("Device initialized successfully!");
    println!();
    println!("  Phone:     {}", config.phone_number);
    println!("  Relay:     {}", config.signaling_server_url);
    if let Some(name) = &config.user_name {
        println!("  Name:      {name}");
    }
    println!("  Data dir:  {}", data_dir.display());

    Ok(())
}
