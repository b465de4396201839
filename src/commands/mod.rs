//! CLI command implementations.
//!
//! - [`entries`] - get, set, remove, list, dump and clear
//! - [`stats`] - entry counts and database size

pub mod entries;
pub mod stats;

use anyhow::Result;
use prefstore::PrefsStore;
use prefstore::backend::BackendKind;
use prefstore::config::{CipherAlgorithm, PrefsConfig, default_db_path};
use std::path::PathBuf;

use crate::StoreArgs;

/// A store opened for one CLI invocation.
pub struct OpenedStore {
    pub store: PrefsStore,
    /// Database file, `None` for the memory backend.
    pub path: Option<PathBuf>,
}

/// Resolve config and flags into an open, loaded store.
pub fn open_store(args: &StoreArgs) -> Result<OpenedStore> {
    let config = resolve_config(args)?;

    let validation = config.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    let path = match config.backend {
        BackendKind::Memory => None,
        BackendKind::Sqlite => Some(match &config.path {
            Some(path) => path.clone(),
            None => default_db_path()?,
        }),
        BackendKind::Redb => Some(match &config.path {
            Some(path) => path.clone(),
            None => default_db_path()?.with_extension("redb"),
        }),
    };

    let mut builder = config.to_builder().workers(1).preload(true);
    if let Some(path) = &path {
        builder = builder.path(path);
    }

    Ok(OpenedStore {
        store: builder.build()?,
        path,
    })
}

/// Config file (if any) with command-line overrides applied.
fn resolve_config(args: &StoreArgs) -> Result<PrefsConfig> {
    let mut config = match &args.config {
        Some(path) => PrefsConfig::load_from(path)?,
        None => PrefsConfig::default(),
    };

    if let Some(db) = &args.db {
        config.path = Some(db.clone());
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(secret) = &args.secret {
        config.encryption.enabled = true;
        config.encryption.algorithm = CipherAlgorithm::Aes;
        config.encryption.secret = Some(secret.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("prefstore.toml");
        std::fs::write(&config_path, "backend = \"redb\"\nworkers = 2\n").unwrap();

        let args = StoreArgs {
            config: Some(config_path),
            db: Some(tmp.path().join("override.db")),
            backend: Some(BackendKind::Sqlite),
            secret: Some("s3cret".to_string()),
        };
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.workers, 2);
        assert_eq!(config.path, Some(tmp.path().join("override.db")));
        assert!(config.encryption.enabled);
    }

    #[test]
    fn test_open_store_reports_path() {
        let tmp = TempDir::new().unwrap();
        let args = StoreArgs {
            db: Some(tmp.path().join("cli.db")),
            ..Default::default()
        };
        let opened = open_store(&args).unwrap();

        assert_eq!(opened.path, Some(tmp.path().join("cli.db")));
        assert!(opened.store.is_loaded());
        assert_eq!(opened.store.backend_name(), "sqlite");
    }

    #[test]
    fn test_memory_backend_has_no_path() {
        let args = StoreArgs {
            backend: Some(BackendKind::Memory),
            ..Default::default()
        };
        let opened = open_store(&args).unwrap();
        assert!(opened.path.is_none());
    }
}
