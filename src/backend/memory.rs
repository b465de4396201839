//! In-memory table backend.
//!
//! Non-persistent row storage using DashMap for concurrent access. Useful
//! for tests, and for sharing one "disk" between several store instances to
//! simulate a process restart.

use super::{Row, TableBackend};
use anyhow::Result;
use dashmap::DashMap;

/// In-memory row storage.
///
/// All data is lost when the backend is dropped. Wrap it in an `Arc` to
/// share it between stores.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: DashMap<String, Row>,
}

impl MemoryBackend {
    /// Creates a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows are stored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a copy of the row stored under `key`.
    pub fn row(&self, key: &str) -> Option<Row> {
        self.rows.get(key).map(|r| r.value().clone())
    }
}

impl TableBackend for MemoryBackend {
    fn upsert(&self, rows: &[Row]) -> Result<()> {
        for row in rows {
            self.rows.insert(row.key.clone(), row.clone());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.rows.remove(key).is_some())
    }

    fn delete_all(&self) -> Result<usize> {
        let removed = self.rows.len();
        self.rows.clear();
        Ok(removed)
    }

    fn scan(&self) -> Result<Vec<Row>> {
        Ok(self.rows.iter().map(|r| r.value().clone()).collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites() {
        let backend = MemoryBackend::new();
        backend.upsert(&[Row::new("k", "String", "v1")]).unwrap();
        backend.upsert(&[Row::new("k", "String", "v2")]).unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(backend.row("k").unwrap().value, "v2");
    }

    #[test]
    fn test_delete() {
        let backend = MemoryBackend::new();
        backend.upsert(&[Row::new("k", "String", "v")]).unwrap();

        assert!(backend.delete("k").unwrap());
        assert!(!backend.delete("k").unwrap());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_delete_many_default_impl() {
        let backend = MemoryBackend::new();
        backend
            .upsert(&[Row::new("a", "String", "1"), Row::new("b", "String", "2")])
            .unwrap();

        let removed = backend
            .delete_many(&["a".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_delete_all() {
        let backend = MemoryBackend::new();
        backend
            .upsert(&[Row::new("a", "String", "1"), Row::new("b", "String", "2")])
            .unwrap();

        assert_eq!(backend.delete_all().unwrap(), 2);
        assert!(backend.scan().unwrap().is_empty());
    }
}
