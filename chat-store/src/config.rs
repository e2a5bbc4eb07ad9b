//! Local client configuration (`config.json`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

const CONFIG_FILE: &str = "config.json";

/// Relay used when none is configured.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:9090";

/// Identity and relay settings for this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    /// Our normalized phone.
    pub phone_number: String,
    /// WebSocket url of the relay.
    #[serde(default = "default_relay_url")]
    pub signaling_server_url: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

impl LocalConfig {
    /// A config for `phone_number` on the default relay.
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            signaling_server_url: default_relay_url(),
            user_name: None,
        }
    }

    /// Path of the config file under `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Load the config. Missing or invalid files yield `None`.
    pub async fn load(data_dir: &Path) -> Option<Self> {
        let contents = tokio::fs::read_to_string(Self::path(data_dir)).await.ok()?;
        match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "Invalid local configuration");
                None
            }
        }
    }

    /// Save the config, creating `data_dir` if needed.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir).await?;
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(Self::path(data_dir), contents).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut config = LocalConfig::new("+1111");
        config.user_name = Some("Ana".into());

        config.save(dir.path()).await.unwrap();
        assert_eq!(LocalConfig::load(dir.path()).await, Some(config));
    }

    #[tokio::test]
    async fn missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(LocalConfig::load(dir.path()).await.is_none());
    }

    #[test]
    fn relay_url_defaults_when_absent() {
        let config: LocalConfig = serde_json::from_str(r#"{"phoneNumber":"+1111"}"#).unwrap();
        assert_eq!(config.signaling_server_url, DEFAULT_RELAY_URL);
        assert!(config.user_name.is_none());
    }

    #[test]
    fn uses_camel_case_keys() {
        let json = serde_json::to_string(&LocalConfig::new("+1111")).unwrap();
        assert!(json.contains("phoneNumber"));
        assert!(json.contains("signalingServerUrl"));
        assert!(!json.contains("userName"));
    }
}
