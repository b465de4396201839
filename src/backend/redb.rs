//! Redb table backend.
//!
//! Persists rows in a redb table keyed by entry key, with the type tag and
//! value text stored as a small JSON record.

use super::{Row, TableBackend};
use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Table holding preference rows.
pub(crate) const PREFS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("prefs");

/// Record stored as the redb value.
#[derive(Serialize, Deserialize)]
struct Record {
    type_tag: String,
    value: String,
}

/// Redb-backed table storage.
///
/// `RedbBackend` is `Clone`; clones share one database handle. Each
/// operation runs in its own transaction.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created
    /// - Initialization transaction fails
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open redb database: {}", path.display()))?;

        // Create the table up front so reads never see it missing
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(PREFS_TABLE)
                .context("Failed to initialize prefs table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl TableBackend for RedbBackend {
    fn upsert(&self, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(PREFS_TABLE)
                .context("Failed to open prefs table")?;

            for row in rows {
                let record = Record {
                    type_tag: row.type_tag.clone(),
                    value: row.value.clone(),
                };
                let json = serde_json::to_vec(&record).context("Failed to serialize record")?;
                table
                    .insert(row.key.as_str(), json.as_slice())
                    .with_context(|| format!("Failed to insert key '{}'", row.key))?;
            }
        }
        write_txn
            .commit()
            .context("Failed to commit upsert transaction")?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let removed = {
            let mut table = write_txn
                .open_table(PREFS_TABLE)
                .context("Failed to open prefs table")?;

            table
                .remove(key)
                .with_context(|| format!("Failed to remove key '{key}'"))?
                .is_some()
        };

        write_txn
            .commit()
            .context("Failed to commit delete transaction")?;
        Ok(removed)
    }

    fn delete_all(&self) -> Result<usize> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let removed = {
            let mut table = write_txn
                .open_table(PREFS_TABLE)
                .context("Failed to open prefs table")?;

            let mut keys = Vec::new();
            for item in table.iter().context("Failed to iterate prefs table")? {
                let (key, _) = item.context("Failed to read prefs entry")?;
                keys.push(key.value().to_string());
            }
            for key in &keys {
                table
                    .remove(key.as_str())
                    .with_context(|| format!("Failed to remove key '{key}'"))?;
            }
            keys.len()
        };

        write_txn
            .commit()
            .context("Failed to commit clear transaction")?;
        Ok(removed)
    }

    fn scan(&self) -> Result<Vec<Row>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;

        let table = read_txn
            .open_table(PREFS_TABLE)
            .context("Failed to open prefs table")?;

        let mut rows = Vec::new();
        for item in table.iter().context("Failed to iterate prefs table")? {
            let (key, value) = item.context("Failed to read prefs entry")?;
            let key = key.value().to_string();
            match serde_json::from_slice::<Record>(value.value()) {
                Ok(record) => rows.push(Row {
                    key,
                    type_tag: record.type_tag,
                    value: record.value,
                }),
                Err(e) => tracing::debug!(key = %key, error = %e, "Skipping unreadable record"),
            }
        }
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "redb"
    }
}
