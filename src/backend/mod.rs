//! Durable table backends for the preferences store.
//!
//! A backend persists `(key, type tag, value text)` rows and supports the
//! four operations the store needs: upsert-by-key, delete-by-key,
//! delete-all and a full unordered scan. Backends are synchronous; the store
//! always calls them from its background worker pool.
//!
//! - **SqliteBackend**: single SQLite table, one connection per operation (default)
//! - **RedbBackend**: redb table keyed by entry key
//! - **MemoryBackend**: non-persistent, for tests and embedding
//!
//! # Custom Backends
//!
//! ```ignore
//! use prefstore::backend::{Row, TableBackend};
//!
//! struct PostgresBackend { /* ... */ }
//! impl TableBackend for PostgresBackend { /* ... */ }
//!
//! let store = PrefsStore::builder().backend(PostgresBackend::new()).build()?;
//! ```

mod memory;
mod redb;
mod sqlite;

pub use memory::MemoryBackend;
pub use redb::RedbBackend;
pub use sqlite::SqliteBackend;
pub(crate) use sqlite::validate_table_name;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Built-in backend selection for configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Redb,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Redb => "redb",
            Self::Memory => "memory",
        })
    }
}

/// One persisted entry.
///
/// `value` is the encoded value text, encrypted and base64-wrapped when the
/// store has a cipher configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: String,
    pub type_tag: String,
    pub value: String,
}

impl Row {
    /// Creates a new row.
    pub fn new(key: impl Into<String>, type_tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            type_tag: type_tag.into(),
            value: value.into(),
        }
    }
}

/// Backend trait for durable row storage.
///
/// All backends must be thread-safe (`Send + Sync`): several pool workers
/// may call into the same backend concurrently. Implementations handle
/// their own locking, typically by opening a handle per operation.
pub trait TableBackend: Send + Sync + 'static {
    /// Inserts or replaces every row by key (last write wins).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    fn upsert(&self, rows: &[Row]) -> Result<()>;

    /// Deletes a row by key.
    ///
    /// Returns `Ok(true)` if the key existed, `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Deletes several rows, returning how many existed.
    ///
    /// Default implementation calls [`delete`](Self::delete) per key.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failing delete.
    fn delete_many(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Deletes every row, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    fn delete_all(&self) -> Result<usize>;

    /// Reads every row, in no particular order.
    ///
    /// Rows that cannot be read at all are skipped by the backend; rows that
    /// read fine but do not decode are the store's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be opened or iterated.
    fn scan(&self) -> Result<Vec<Row>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<B: TableBackend + ?Sized> TableBackend for Arc<B> {
    fn upsert(&self, rows: &[Row]) -> Result<()> {
        (**self).upsert(rows)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn delete_many(&self, keys: &[String]) -> Result<usize> {
        (**self).delete_many(keys)
    }

    fn delete_all(&self) -> Result<usize> {
        (**self).delete_all()
    }

    fn scan(&self) -> Result<Vec<Row>> {
        (**self).scan()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
