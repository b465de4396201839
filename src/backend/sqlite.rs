//! SQLite table backend.
//!
//! Stores rows in a single table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS table_preferences (
//!     data_key   TEXT PRIMARY KEY,
//!     data_type  TEXT NOT NULL,
//!     data_value TEXT NOT NULL
//! )
//! ```
//!
//! A fresh connection is opened for every operation and closed when it
//! returns, so pool workers never share a handle.

use super::{Row, TableBackend};
use crate::constants::{COLUMN_KEY, COLUMN_TYPE, COLUMN_VALUE, DEFAULT_TABLE};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed table storage.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    table: String,
}

impl SqliteBackend {
    /// Opens or creates a database at `path` using the default table.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or database cannot be
    /// created, or the table cannot be initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_table(path, DEFAULT_TABLE)
    }

    /// Opens or creates a database at `path` using a custom table name.
    ///
    /// The table name must be a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid or initialization fails.
    pub fn with_table<P: AsRef<Path>>(path: P, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let backend = Self {
            path: path.to_path_buf(),
            table: table.to_string(),
        };

        let conn = backend.connect()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {COLUMN_KEY} TEXT PRIMARY KEY,
                {COLUMN_TYPE} TEXT NOT NULL,
                {COLUMN_VALUE} TEXT NOT NULL
            )"
        ))
        .with_context(|| format!("Failed to create table '{table}'"))?;

        Ok(backend)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the backing table.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open database: {}", self.path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        Ok(conn)
    }
}

/// Checks that `table` is safe to splice into SQL as an identifier.
pub(crate) fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("Invalid table name '{table}': expected [A-Za-z_][A-Za-z0-9_]*");
    }
    Ok(())
}

impl TableBackend for SqliteBackend {
    fn upsert(&self, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to begin upsert transaction")?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {table} ({COLUMN_KEY}, {COLUMN_TYPE}, {COLUMN_VALUE})
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT({COLUMN_KEY}) DO UPDATE SET
                         {COLUMN_TYPE} = excluded.{COLUMN_TYPE},
                         {COLUMN_VALUE} = excluded.{COLUMN_VALUE}",
                    table = self.table
                ))
                .context("Failed to prepare upsert")?;

            for row in rows {
                stmt.execute(params![row.key, row.type_tag, row.value])
                    .with_context(|| format!("Failed to upsert key '{}'", row.key))?;
            }
        }
        tx.commit().context("Failed to commit upsert transaction")?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.connect()?;
        let removed = conn
            .execute(
                &format!("DELETE FROM {} WHERE {COLUMN_KEY} = ?1", self.table),
                params![key],
            )
            .with_context(|| format!("Failed to delete key '{key}'"))?;
        Ok(removed > 0)
    }

    fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to begin delete transaction")?;
        let mut removed = 0;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "DELETE FROM {} WHERE {COLUMN_KEY} = ?1",
                    self.table
                ))
                .context("Failed to prepare delete")?;
            for key in keys {
                removed += stmt
                    .execute(params![key])
                    .with_context(|| format!("Failed to delete key '{key}'"))?;
            }
        }
        tx.commit().context("Failed to commit delete transaction")?;
        Ok(removed)
    }

    fn delete_all(&self) -> Result<usize> {
        let conn = self.connect()?;
        conn.execute(&format!("DELETE FROM {}", self.table), [])
            .context("Failed to clear table")
    }

    fn scan(&self) -> Result<Vec<Row>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMN_KEY}, {COLUMN_TYPE}, {COLUMN_VALUE} FROM {}",
                self.table
            ))
            .context("Failed to prepare scan")?;

        let mapped = stmt
            .query_map([], |r| {
                Ok(Row {
                    key: r.get(0)?,
                    type_tag: r.get(1)?,
                    value: r.get(2)?,
                })
            })
            .context("Failed to scan table")?;

        let mut rows = Vec::new();
        for item in mapped {
            match item {
                Ok(row) => rows.push(row),
                Err(e) => tracing::debug!(error = %e, "Skipping unreadable row"),
            }
        }
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
