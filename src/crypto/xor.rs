//! Repeating-key XOR obfuscation.
//!
//! Hides values from casual inspection of the database file. It offers no
//! confidentiality against anyone who looks for it.

use super::Cipher;
use crate::error::{Error, Result};

/// XOR every byte with the secret, cycling the secret.
pub struct XorCipher {
    key: Vec<u8>,
}

impl XorCipher {
    /// Creates a cipher from a non-empty secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the secret is empty.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::InvalidKey("secret must not be empty".to_string()));
        }
        Ok(Self {
            key: secret.as_bytes().to_vec(),
        })
    }

    fn apply(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

impl Cipher for XorCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(self.apply(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(self.apply(ciphertext))
    }

    fn name(&self) -> &'static str {
        "xor"
    }
}
