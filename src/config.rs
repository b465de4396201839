//! Store configuration loaded from TOML.
//!
//! ```toml
//! path = "/var/lib/app/prefs.db"
//! backend = "sqlite"
//! workers = 4
//! allow_null = true
//!
//! [encryption]
//! enabled = true
//! secret = "..."
//! algorithm = "aes"
//! nonce = "random"
//! ```
//!
//! Every field is optional. When `encryption.secret` is unset the secret is
//! read from the `PREFSTORE_SECRET` environment variable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{BackendKind, validate_table_name};
use crate::constants;
use crate::crypto::NonceMode;
use crate::store::PrefsStoreBuilder;

/// Environment variable consulted for the encryption secret.
pub const SECRET_ENV: &str = "PREFSTORE_SECRET";

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefsConfig {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_allow_null")]
    pub allow_null: bool,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// Cipher algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherAlgorithm {
    #[default]
    Aes,
    Xor,
}

/// Nonce selection for AES, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceSetting {
    #[default]
    Fixed,
    Random,
}

impl From<NonceSetting> for NonceMode {
    fn from(setting: NonceSetting) -> Self {
        match setting {
            NonceSetting::Fixed => Self::Fixed,
            NonceSetting::Random => Self::Random,
        }
    }
}

/// `[encryption]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub algorithm: CipherAlgorithm,
    #[serde(default)]
    pub nonce: NonceSetting,
}

impl EncryptionConfig {
    /// The configured secret, falling back to [`SECRET_ENV`].
    pub fn resolve_secret(&self) -> Option<String> {
        self.secret
            .clone()
            .or_else(|| std::env::var(SECRET_ENV).ok())
            .filter(|s| !s.is_empty())
    }
}

fn default_table() -> String {
    constants::DEFAULT_TABLE.to_string()
}

fn default_workers() -> usize {
    constants::DEFAULT_WORKERS
}

fn default_allow_null() -> bool {
    true
}

fn default_shutdown_timeout_ms() -> u64 {
    constants::DEFAULT_SHUTDOWN_TIMEOUT_MS
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            path: None,
            backend: BackendKind::default(),
            table: default_table(),
            workers: default_workers(),
            allow_null: default_allow_null(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            encryption: EncryptionConfig::default(),
        }
    }
}

/// Default database file under the platform data directory.
///
/// # Errors
///
/// Returns an error if the platform has no data directory.
pub fn default_db_path() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(dir.join("prefstore").join(constants::DEFAULT_DB_FILE))
}

impl PrefsConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or unknown enum values
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PrefsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Zero workers
    /// - Empty or non-identifier table name
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.workers == 0 {
            errors.push("workers cannot be 0".to_string());
        } else if self.workers > constants::MAX_WORKERS {
            warnings.push(format!(
                "workers = {} exceeds the maximum; using {}",
                self.workers,
                constants::MAX_WORKERS
            ));
        }

        if let Err(e) = validate_table_name(&self.table) {
            errors.push(e.to_string());
        }

        if self.backend == BackendKind::Memory && self.path.is_some() {
            warnings.push("path is ignored by the memory backend".to_string());
        }
        if self.backend == BackendKind::Redb && self.table != constants::DEFAULT_TABLE {
            warnings.push("table is ignored by the redb backend".to_string());
        }

        if self.shutdown_timeout_ms == 0 {
            warnings.push(
                "shutdown_timeout_ms = 0 drops in-flight writes when the store closes".to_string(),
            );
        }

        let enc = &self.encryption;
        if enc.enabled {
            if enc.resolve_secret().is_none() {
                warnings.push(format!(
                    "encryption is enabled but no secret is set (config or {SECRET_ENV}); values will be stored unencrypted"
                ));
            }
            match enc.algorithm {
                CipherAlgorithm::Xor => warnings.push(
                    "xor only obfuscates values; use algorithm = \"aes\" for encryption".to_string(),
                ),
                CipherAlgorithm::Aes if enc.nonce == NonceSetting::Fixed => warnings.push(
                    "nonce = \"fixed\" makes equal values produce equal ciphertext".to_string(),
                ),
                CipherAlgorithm::Aes => {},
            }
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }

    /// Builder configured from this file. Callers may override further.
    pub fn to_builder(&self) -> PrefsStoreBuilder {
        let mut builder = PrefsStoreBuilder::new()
            .kind(self.backend)
            .table(self.table.clone())
            .workers(self.workers)
            .allow_null(self.allow_null)
            .shutdown_timeout(Duration::from_millis(self.shutdown_timeout_ms));

        if let Some(path) = &self.path {
            builder = builder.path(path);
        }

        let enc = &self.encryption;
        if enc.enabled {
            // A missing secret becomes an empty one, which the builder
            // reports and replaces with plain text.
            let secret = enc.resolve_secret().unwrap_or_default();
            builder = match enc.algorithm {
                CipherAlgorithm::Aes => builder.encryption(secret, enc.nonce.into()),
                CipherAlgorithm::Xor => builder.xor(secret),
            };
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: PrefsConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.table, constants::DEFAULT_TABLE);
        assert_eq!(config.workers, constants::DEFAULT_WORKERS);
        assert!(config.allow_null);
        assert!(!config.encryption.enabled);
        assert!(config.path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
path = "/tmp/prefs.db"
backend = "redb"
workers = 2
allow_null = false
shutdown_timeout_ms = 100

[encryption]
enabled = true
secret = "hunter2"
algorithm = "aes"
nonce = "random"
"#;
        let config: PrefsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/tmp/prefs.db")));
        assert_eq!(config.backend, BackendKind::Redb);
        assert_eq!(config.workers, 2);
        assert!(!config.allow_null);
        assert_eq!(config.shutdown_timeout_ms, 100);
        assert!(config.encryption.enabled);
        assert_eq!(config.encryption.nonce, NonceSetting::Random);
        assert_eq!(config.encryption.resolve_secret().as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result: std::result::Result<PrefsConfig, _> = toml::from_str(r#"backend = "mysql""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_defaults() {
        let result = PrefsConfig::default().validate().unwrap();
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let config = PrefsConfig {
            workers: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_validate_bad_table_fails() {
        let config = PrefsConfig {
            table: "prefs; DROP TABLE x".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid table name"));
    }

    #[test]
    fn test_validate_warnings() {
        let config = PrefsConfig {
            workers: constants::MAX_WORKERS + 1,
            backend: BackendKind::Memory,
            path: Some(PathBuf::from("ignored.db")),
            encryption: EncryptionConfig {
                enabled: true,
                secret: Some("s".to_string()),
                algorithm: CipherAlgorithm::Xor,
                nonce: NonceSetting::Fixed,
            },
            ..Default::default()
        };
        let result = config.validate().unwrap();
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefstore.toml");
        fs::write(&path, "workers = 3\nbackend = \"memory\"\n").unwrap();

        let config = PrefsConfig::load_from(&path).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.backend, BackendKind::Memory);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = PrefsConfig::load_from("/nonexistent/prefstore.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_builder_from_config_opens_store() {
        let tmp = TempDir::new().unwrap();
        let config = PrefsConfig {
            path: Some(tmp.path().join("prefs.db")),
            encryption: EncryptionConfig {
                enabled: true,
                secret: Some("hunter2".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let store = config.to_builder().build().unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert_eq!(store.cipher_name(), Some("aes-gcm-fixed"));
    }
}
