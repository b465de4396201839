//! Error types for value encoding and encryption.
//!
//! Store operations never surface these to callers; they are logged and the
//! affected row or entry is skipped. Backends and configuration loading use
//! `anyhow` with context instead.

/// Result type for codec and cipher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Codec and cipher errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Stored type tag does not name a supported value kind.
    #[error("unknown type tag: {tag}")]
    UnknownTypeTag { tag: String },

    /// Stored text could not be parsed as its declared kind.
    #[error("cannot decode '{text}' as {kind}: {reason}")]
    Decode {
        kind: &'static str,
        text: String,
        reason: String,
    },

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Decryption failed (wrong key, truncated or tampered ciphertext).
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Cipher could not be constructed from the given secret.
    #[error("invalid cipher key: {0}")]
    InvalidKey(String),
}

impl Error {
    /// Create a decode error.
    pub fn decode(kind: &'static str, text: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            kind,
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an unknown type tag error.
    pub fn unknown_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTypeTag { tag: tag.into() }
    }

    /// Create a decryption error.
    pub fn decrypt(reason: impl ToString) -> Self {
        Self::Decrypt(reason.to_string())
    }

    /// Create an encryption error.
    pub fn encrypt(reason: impl ToString) -> Self {
        Self::Encrypt(reason.to_string())
    }
}
