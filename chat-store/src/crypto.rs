//! At-rest encryption for stored conversations.
//!
//! - Key: SHA-256 of a passphrase, computed once per [`StorageCipher`]
//! - Cipher: AES-256-CBC with PKCS#7 padding
//! - IV: 16 fresh random bytes per encryption
//! - Stored form: `hex(iv) ":" hex(ciphertext)`
//!
//! There is no authentication tag. This keeps the stored format readable by
//! existing clients; it is not a confidentiality guarantee against an
//! attacker who can modify files.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the CBC initialization vector (one AES block).
pub const IV_SIZE: usize = 16;

/// Passphrase compiled into every client.
///
/// WEAK: every installation shares this key, so anyone with the binary can
/// decrypt any store. Kept so existing stores stay readable.
pub const DEFAULT_STORAGE_PASSPHRASE: &str = "bitcoin";

/// Cipher bound to one storage key.
///
/// Construct once at startup and share by reference or `Arc`.
pub struct StorageCipher {
    key: Zeroizing<[u8; 32]>,
}

impl StorageCipher {
    /// Derive the storage key from `passphrase` (SHA-256).
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Encrypt UTF-8 text into `hex(iv):hex(ciphertext)`.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let cipher = Aes256CbcEnc::new(&(*self.key).into(), &iv.into());
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
    }

    /// Decrypt text produced by [`StorageCipher::encrypt`].
    ///
    /// Splits on the first `:` and requires exactly two hex segments.
    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let (iv_hex, ct_hex) = stored
            .trim()
            .split_once(':')
            .ok_or(CryptoError::Malformed("missing separator"))?;
        if ct_hex.contains(':') {
            return Err(CryptoError::Malformed("too many segments"));
        }

        let iv = hex::decode(iv_hex).map_err(|_| CryptoError::Malformed("iv is not hex"))?;
        let iv: [u8; IV_SIZE] = iv
            .try_into()
            .map_err(|_| CryptoError::Malformed("iv has wrong length"))?;
        let ciphertext =
            hex::decode(ct_hex).map_err(|_| CryptoError::Malformed("ciphertext is not hex"))?;

        let cipher = Aes256CbcDec::new(&(*self.key).into(), &iv.into());
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }
}

impl Default for StorageCipher {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_STORAGE_PASSPHRASE)
    }
}

impl std::fmt::Debug for StorageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCipher").finish_non_exhaustive()
    }
}
