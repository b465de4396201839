//! Async wrappers for the blocking store operations.
//!
//! Loading and flushing wait on background workers. These versions park
//! the wait off the async runtime so they are safe to call from tasks.

use anyhow::{Context, Result};
use std::time::Duration;

use super::prefs::PrefsStore;

impl PrefsStore {
    /// Loads the cache without blocking the runtime.
    ///
    /// Async version of `load(true)`.
    pub async fn load_async(&self) -> Result<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.load_with(move || {
            let _ = tx.send(());
        });
        rx.await.context("Load task dropped before completing")
    }

    /// Waits for scheduled writes without blocking the runtime.
    ///
    /// Async version of `flush` that uses `spawn_blocking`.
    pub async fn flush_async(&self) -> Result<()> {
        let inflight = self.pool.inflight();
        tokio::task::spawn_blocking(move || inflight.wait_idle(None))
            .await
            .context("Task join error")?;
        Ok(())
    }

    /// Async version of `flush_timeout`. Returns `false` on timeout.
    pub async fn flush_timeout_async(&self, timeout: Duration) -> Result<bool> {
        let inflight = self.pool.inflight();
        tokio::task::spawn_blocking(move || inflight.wait_idle(Some(timeout)))
            .await
            .context("Task join error")
    }
}
