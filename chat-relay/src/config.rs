//! Configuration loading for chat-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`). Every
//! field has a default, so a missing file or section is fine.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration for chat-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for WebSocket and HTTP (default: 0.0.0.0:9090).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load configuration, falling back to defaults when the file does not
    /// exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::ReadError { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Replace the port of the bind address (the `PORT` environment
    /// variable in deployment).
    pub fn with_port_override(mut self, port: Option<&str>) -> Result<Self, ConfigError> {
        let Some(port) = port else {
            return Ok(self);
        };
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
            value: port.to_string(),
        })?;
        let mut addr = self.bind_addr()?;
        addr.set_port(port);
        self.server.bind_address = addr.to_string();
        Ok(self)
    }

    /// The bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress {
                value: self.server.bind_address.clone(),
            })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// `bind_address` is not `ip:port`.
    #[error("invalid bind address: {value}")]
    InvalidBindAddress {
        /// The rejected value.
        value: String,
    },
    /// Port override is not a number in 0..=65535.
    #[error("invalid port: {value}")]
    InvalidPort {
        /// The rejected value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
        assert!(config.http.metrics_enabled);
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:5000"

[http]
metrics_enabled = false
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:5000");
        assert!(!config.http.metrics_enabled);
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let config: Config = toml::from_str("[server]\n").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
        assert!(config.http.metrics_enabled);

        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("relay.toml")).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[server\nbind_address = ").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn port_override_replaces_port_only() {
        let config = Config::default().with_port_override(Some("8081")).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8081");

        let config = Config::default().with_port_override(None).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9090");
    }

    #[test]
    fn port_override_rejects_garbage() {
        assert!(matches!(
            Config::default().with_port_override(Some("http")),
            Err(ConfigError::InvalidPort { .. })
        ));
        assert!(matches!(
            Config::default().with_port_override(Some("70000")),
            Err(ConfigError::InvalidPort { .. })
        ));
    }
}
