//! Row encoding and backend access for the store.
//!
//! Everything here runs on pool workers or during a blocking load. Failures
//! are logged and swallowed: the in-memory cache stays authoritative for the
//! life of the process.

use super::value::Value;
use crate::backend::{Row, TableBackend};
use crate::crypto::Cipher;
use crate::error::Result;
use std::sync::Arc;

pub(crate) struct Persister {
    backend: Box<dyn TableBackend>,
    cipher: Option<Arc<dyn Cipher>>,
}

impl Persister {
    pub(crate) fn new(backend: Box<dyn TableBackend>, cipher: Option<Arc<dyn Cipher>>) -> Self {
        Self { backend, cipher }
    }

    pub(crate) fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub(crate) fn cipher_name(&self) -> Option<&'static str> {
        self.cipher.as_deref().map(Cipher::name)
    }

    /// Encodes a cached value into a row, encrypting the text if configured.
    pub(crate) fn encode(&self, key: &str, value: &Value) -> Result<Row> {
        let text = value.to_text();
        let text = match &self.cipher {
            Some(cipher) => cipher.encrypt_text(&text)?,
            None => text,
        };
        Ok(Row::new(key, value.kind().tag(), text))
    }

    /// Decodes a stored row back into a value.
    pub(crate) fn decode(&self, row: &Row) -> Result<Value> {
        match &self.cipher {
            Some(cipher) => {
                let text = cipher.decrypt_text(&row.value)?;
                Value::decode(&row.type_tag, &text)
            },
            None => Value::decode(&row.type_tag, &row.value),
        }
    }

    /// Writes one committed batch: upserts first, then unset keys.
    pub(crate) fn write_batch(&self, upserts: &[(String, Value)], unsets: &[String]) {
        let mut rows = Vec::with_capacity(upserts.len());
        for (key, value) in upserts {
            match self.encode(key, value) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!(key = %key, error = %e, "Skipping entry that failed to encode"),
            }
        }

        if !rows.is_empty() {
            match self.backend.upsert(&rows) {
                Ok(()) => tracing::debug!(
                    backend = self.backend.name(),
                    rows = rows.len(),
                    "Persisted batch"
                ),
                Err(e) => tracing::warn!(
                    backend = self.backend.name(),
                    rows = rows.len(),
                    error = %e,
                    "Failed to persist batch"
                ),
            }
        }

        if !unsets.is_empty()
            && let Err(e) = self.backend.delete_many(unsets)
        {
            tracing::warn!(
                backend = self.backend.name(),
                keys = unsets.len(),
                error = %e,
                "Failed to delete unset keys"
            );
        }
    }

    pub(crate) fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            tracing::warn!(backend = self.backend.name(), key = %key, error = %e, "Failed to delete key");
        }
    }

    pub(crate) fn delete_all(&self) {
        match self.backend.delete_all() {
            Ok(removed) => tracing::debug!(backend = self.backend.name(), removed, "Cleared table"),
            Err(e) => tracing::warn!(backend = self.backend.name(), error = %e, "Failed to clear table"),
        }
    }

    /// Reads and decodes every row. Undecodable rows are skipped.
    pub(crate) fn load_all(&self) -> Vec<(String, Value)> {
        let rows = match self.backend.scan() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Failed to read stored preferences; starting empty"
                );
                return Vec::new();
            },
        };

        let total = rows.len();
        let mut entries = Vec::with_capacity(total);
        for row in rows {
            match self.decode(&row) {
                Ok(value) => entries.push((row.key, value)),
                Err(e) => tracing::debug!(key = %row.key, error = %e, "Skipping undecodable row"),
            }
        }

        let skipped = total - entries.len();
        if skipped > 0 {
            tracing::warn!(skipped, total, "Some stored preferences could not be decoded");
        }
        entries
    }
}
