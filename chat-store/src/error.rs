//! Error types for chat-store.

use thiserror::Error;

/// Errors from the at-rest encryption contract.
///
/// Carries no key-dependent detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Stored text is not `hex(iv):hex(ciphertext)`.
    #[error("malformed ciphertext: {0}")]
    Malformed(&'static str),

    /// Padding check failed (wrong key or corrupted data).
    #[error("decryption failed")]
    DecryptionFailed,

    /// Decrypted bytes are not UTF-8.
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors that can occur in store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encryption or decryption failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Stored JSON could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attachment payload was not valid base64.
    #[error("invalid attachment encoding: {0}")]
    InvalidAttachment(#[from] base64::DecodeError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
