//! # chat-store
//!
//! Client-side persistence for relaychat.
//!
//! Everything here lives under one data directory owned by the caller:
//!
//! ```text
//! <data dir>/
//!   config.json                  LocalConfig
//!   contacts.json                phone -> display name
//!   conversations/<id>.dat       hex(iv):hex(AES-256-CBC(Conversation JSON))
//!   media/img/img_xxxxxxxx.jpg
//!   media/audio/audio_xxxxxxxx.m4a
//! ```
//!
//! Readers treat every storage failure as "no data": a conversation that
//! cannot be decrypted or parsed is simply absent.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod contacts;
mod conversation;
mod crypto;
mod error;
mod media;

pub use config::{LocalConfig, DEFAULT_RELAY_URL};
pub use contacts::ContactBook;
pub use conversation::{Conversation, ConversationStore, Direction, Message};
pub use crypto::{StorageCipher, DEFAULT_STORAGE_PASSPHRASE, IV_SIZE};
pub use error::{CryptoError, Result, StorageError};
pub use media::{decode_attachment, encode_attachment, MediaStore};
