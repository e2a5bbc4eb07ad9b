//! Error types for chat-relay.
//!
//! Protocol errors are not here: they never end a connection, they are
//! answered with an `error` envelope (see [`chat_types::ProtocolError`]).

/// Main error type for chat-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error (bind, accept).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let err: RelayError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy").into();
        assert!(err.to_string().contains("busy"));
    }
}
