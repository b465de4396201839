//! Value ciphers for obscuring persisted preference values.
//!
//! The store encrypts each value's text before it reaches the backend and
//! decrypts it on load. Ciphertext is kept as standard base64 so it fits a
//! TEXT column.
//!
//! - [`AesCipher`]: AES-128-GCM; deterministic (fixed nonce) or randomized
//! - [`XorCipher`]: repeating-key XOR obfuscation, not encryption

mod aes;
mod xor;

pub use aes::{AesCipher, NonceMode};
pub use xor::XorCipher;

use crate::constants::CIPHER_KEY_LEN;
use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Symmetric cipher bound to a key at construction.
pub trait Cipher: Send + Sync + 'static {
    /// Encrypts raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encrypt`] if the underlying primitive fails.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts raw bytes produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decrypt`] on a wrong key or damaged input.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Short cipher name for logs.
    fn name(&self) -> &'static str;

    /// Encrypts UTF-8 text into base64 ciphertext.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    fn encrypt_text(&self, text: &str) -> Result<String> {
        Ok(STANDARD.encode(self.encrypt(text.as_bytes())?))
    }

    /// Decrypts base64 ciphertext back into UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not base64, decryption fails, or the
    /// plaintext is not UTF-8.
    fn decrypt_text(&self, text: &str) -> Result<String> {
        let raw = STANDARD.decode(text).map_err(Error::decrypt)?;
        let plain = self.decrypt(&raw)?;
        String::from_utf8(plain).map_err(Error::decrypt)
    }
}

/// Derives key material from a secret string.
///
/// Uses the first [`CIPHER_KEY_LEN`] bytes of the UTF-8 secret, zero-padded
/// when shorter.
pub(crate) fn derive_key(secret: &str) -> Result<[u8; CIPHER_KEY_LEN]> {
    if secret.is_empty() {
        return Err(Error::InvalidKey("secret must not be empty".to_string()));
    }
    let bytes = secret.as_bytes();
    let mut key = [0u8; CIPHER_KEY_LEN];
    let n = bytes.len().min(CIPHER_KEY_LEN);
    key[..n].copy_from_slice(&bytes[..n]);
    Ok(key)
}
