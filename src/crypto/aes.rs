//! AES-128-GCM value cipher.

use super::{Cipher, derive_key};
use crate::constants::NONCE_LEN;
use crate::error::{Error, Result};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Nonce};

static ZERO_NONCE: [u8; NONCE_LEN] = [0; NONCE_LEN];

/// How nonces are chosen for each encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonceMode {
    /// All-zero nonce. The same plaintext under the same key always yields
    /// the same ciphertext, which leaks equality between stored values.
    #[default]
    Fixed,
    /// Fresh random nonce per value, stored as a 12-byte ciphertext prefix.
    Random,
}

/// AES-128-GCM cipher keyed from a secret string.
pub struct AesCipher {
    cipher: Aes128Gcm,
    mode: NonceMode,
}

impl AesCipher {
    /// Creates a cipher from `secret` (see [`derive_key`](super::derive_key)).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the secret is empty.
    pub fn new(secret: &str, mode: NonceMode) -> Result<Self> {
        let key = derive_key(secret)?;
        let cipher =
            Aes128Gcm::new_from_slice(&key).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self { cipher, mode })
    }

    /// The nonce mode this cipher was built with.
    pub fn mode(&self) -> NonceMode {
        self.mode
    }
}

impl Cipher for AesCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self.mode {
            NonceMode::Fixed => {
                let nonce = Nonce::from_slice(&ZERO_NONCE);
                self.cipher.encrypt(nonce, plaintext).map_err(Error::encrypt)
            },
            NonceMode::Random => {
                let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
                let ciphertext = self
                    .cipher
                    .encrypt(&nonce, plaintext)
                    .map_err(Error::encrypt)?;

                let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
                out.extend_from_slice(nonce.as_slice());
                out.extend_from_slice(&ciphertext);
                Ok(out)
            },
        }
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let (nonce, body) = match self.mode {
            NonceMode::Fixed => (&ZERO_NONCE[..], ciphertext),
            NonceMode::Random => {
                if ciphertext.len() < NONCE_LEN {
                    return Err(Error::decrypt("ciphertext too short"));
                }
                ciphertext.split_at(NONCE_LEN)
            },
        };
        self.cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(Error::decrypt)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            NonceMode::Fixed => "aes-gcm-fixed",
            NonceMode::Random => "aes-gcm-random",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "Ser5@3h6K#t5?f&58";

    #[test]
    fn test_fixed_mode_is_deterministic() {
        let cipher = AesCipher::new(SECRET, NonceMode::Fixed).unwrap();
        let a = cipher.encrypt_text("Sami").unwrap();
        let b = cipher.encrypt_text("Sami").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, "Sami");
        assert_eq!(cipher.decrypt_text(&a).unwrap(), "Sami");
    }

    #[test]
    fn test_random_mode_varies_and_decrypts() {
        let cipher = AesCipher::new(SECRET, NonceMode::Random).unwrap();
        let a = cipher.encrypt_text("Sami").unwrap();
        let b = cipher.encrypt_text("Sami").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt_text(&a).unwrap(), "Sami");
        assert_eq!(cipher.decrypt_text(&b).unwrap(), "Sami");
    }

    #[test]
    fn test_wrong_key_fails() {
        let writer = AesCipher::new(SECRET, NonceMode::Fixed).unwrap();
        let reader = AesCipher::new("another secret", NonceMode::Fixed).unwrap();
        let ct = writer.encrypt_text("value").unwrap();
        assert!(matches!(reader.decrypt_text(&ct), Err(Error::Decrypt(_))));
    }

    #[test]
    fn test_modes_are_not_interchangeable() {
        let fixed = AesCipher::new(SECRET, NonceMode::Fixed).unwrap();
        let random = AesCipher::new(SECRET, NonceMode::Random).unwrap();
        let ct = fixed.encrypt_text("value").unwrap();
        assert!(random.decrypt_text(&ct).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = AesCipher::new(SECRET, NonceMode::Fixed).unwrap();
        let mut raw = cipher.encrypt(b"value").unwrap();
        raw[0] ^= 0xff;
        assert!(cipher.decrypt(&raw).is_err());
    }

    #[test]
    fn test_random_mode_rejects_short_input() {
        let cipher = AesCipher::new(SECRET, NonceMode::Random).unwrap();
        assert!(cipher.decrypt(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = AesCipher::new(SECRET, NonceMode::Fixed).unwrap();
        let ct = cipher.encrypt_text("").unwrap();
        assert_eq!(cipher.decrypt_text(&ct).unwrap(), "");
    }
}
