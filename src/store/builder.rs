//! Store construction.

use super::persist::Persister;
use super::pool::WorkerPool;
use super::prefs::PrefsStore;
use crate::backend::{BackendKind, MemoryBackend, RedbBackend, SqliteBackend, TableBackend};
use crate::constants::{DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_TABLE, DEFAULT_WORKERS};
use crate::crypto::{AesCipher, Cipher, NonceMode, XorCipher};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

enum CipherChoice {
    None,
    Aes { secret: String, mode: NonceMode },
    Xor { secret: String },
    Custom(Arc<dyn Cipher>),
}

/// Builder for [`PrefsStore`].
///
/// Defaults: SQLite at the platform data directory, no encryption,
/// [`DEFAULT_WORKERS`] workers, nulls allowed.
pub struct PrefsStoreBuilder {
    backend: Option<Box<dyn TableBackend>>,
    kind: BackendKind,
    path: Option<PathBuf>,
    table: String,
    cipher: CipherChoice,
    workers: usize,
    allow_null: bool,
    shutdown_timeout: Duration,
    preload: Option<bool>,
}

impl Default for PrefsStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefsStoreBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            kind: BackendKind::Sqlite,
            path: None,
            table: DEFAULT_TABLE.to_string(),
            cipher: CipherChoice::None,
            workers: DEFAULT_WORKERS,
            allow_null: true,
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            preload: None,
        }
    }

    /// Uses an already constructed backend. Overrides `kind` and `path`.
    pub fn backend<B: TableBackend>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Selects a built-in backend.
    pub fn kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Database file for the built-in file backends.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Table name for the SQLite backend.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Encrypts values with AES-128-GCM keyed from `secret`.
    pub fn encryption(mut self, secret: impl Into<String>, mode: NonceMode) -> Self {
        self.cipher = CipherChoice::Aes {
            secret: secret.into(),
            mode,
        };
        self
    }

    /// Obfuscates values with repeating-key XOR.
    pub fn xor(mut self, secret: impl Into<String>) -> Self {
        self.cipher = CipherChoice::Xor {
            secret: secret.into(),
        };
        self
    }

    /// Uses a caller-provided cipher.
    pub fn cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = CipherChoice::Custom(cipher);
        self
    }

    /// Stores values as plain text.
    pub fn no_encryption(mut self) -> Self {
        self.cipher = CipherChoice::None;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }

    /// How long dropping the store waits for in-flight writes.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Starts the initial load as part of [`build`](Self::build).
    pub fn preload(mut self, blocking: bool) -> Self {
        self.preload = Some(blocking);
        self
    }

    /// Opens the backend, starts the workers and returns the store.
    ///
    /// A cipher that cannot be constructed is logged and the store falls
    /// back to plain text.
    ///
    /// # Errors
    ///
    /// Returns an error if no default data directory exists, the backend
    /// cannot be opened, or the worker pool cannot start.
    pub fn build(self) -> Result<PrefsStore> {
        let cipher = build_cipher(self.cipher);
        let backend = match self.backend {
            Some(backend) => backend,
            None => open_backend(self.kind, self.path.as_deref(), &self.table)?,
        };
        let pool = WorkerPool::new(self.workers, self.shutdown_timeout)?;

        let persister = Persister::new(backend, cipher);
        let store = PrefsStore::from_parts(persister, pool, self.allow_null);

        tracing::info!(
            backend = store.backend_name(),
            cipher = store.cipher_name().unwrap_or("none"),
            workers = store.workers(),
            allow_null = self.allow_null,
            "Opened preferences store"
        );

        if let Some(blocking) = self.preload {
            store.load(blocking);
        }
        Ok(store)
    }
}

fn open_backend(kind: BackendKind, path: Option<&Path>, table: &str) -> Result<Box<dyn TableBackend>> {
    let resolve = |ext: &str| -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(crate::config::default_db_path()?.with_extension(ext)),
        }
    };

    let backend: Box<dyn TableBackend> = match kind {
        BackendKind::Memory => Box::new(MemoryBackend::new()),
        BackendKind::Sqlite => {
            let path = resolve("db")?;
            Box::new(
                SqliteBackend::with_table(&path, table)
                    .with_context(|| format!("Failed to open SQLite store at {}", path.display()))?,
            )
        },
        BackendKind::Redb => {
            let path = resolve("redb")?;
            Box::new(
                RedbBackend::open(&path)
                    .with_context(|| format!("Failed to open redb store at {}", path.display()))?,
            )
        },
    };
    Ok(backend)
}

fn build_cipher(choice: CipherChoice) -> Option<Arc<dyn Cipher>> {
    let built: crate::error::Result<Arc<dyn Cipher>> = match choice {
        CipherChoice::None => return None,
        CipherChoice::Custom(cipher) => return Some(cipher),
        CipherChoice::Aes { secret, mode } => {
            AesCipher::new(&secret, mode).map(|c| Arc::new(c) as Arc<dyn Cipher>)
        },
        CipherChoice::Xor { secret } => XorCipher::new(&secret).map(|c| Arc::new(c) as Arc<dyn Cipher>),
    };

    match built {
        Ok(cipher) => Some(cipher),
        Err(e) => {
            tracing::warn!(error = %e, "Cipher unavailable; storing values unencrypted");
            None
        },
    }
}
