//! The write-behind preferences store.

use super::builder::PrefsStoreBuilder;
use super::persist::Persister;
use super::pool::WorkerPool;
use super::value::{FromValue, Value};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Progress of the one-time initial load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing has been read from the backend yet.
    Empty,
    /// A load is running.
    Loading,
    /// The cache has been populated (or the load failed and was given up).
    Loaded,
}

/// State shared with background workers.
pub(crate) struct Shared {
    cache: DashMap<String, Value>,
    loaded: AtomicBool,
    state: Mutex<LoadState>,
    state_changed: Condvar,
    pub(crate) persister: Persister,
}

impl Shared {
    /// Claims the load if nobody has started it. Returns `true` for the claimer.
    fn claim_load(&self) -> bool {
        let mut state = self.state.lock();
        if *state == LoadState::Empty {
            *state = LoadState::Loading;
            true
        } else {
            false
        }
    }

    /// Reads the backend into the cache and marks the store loaded.
    ///
    /// The store is marked loaded even if the backend panics mid-scan.
    fn populate(&self) {
        let _done = MarkLoaded(self);
        let entries = self.persister.load_all();
        let count = entries.len();
        for (key, value) in entries {
            self.cache.entry(key).or_insert(value);
        }

        tracing::debug!(
            backend = self.persister.backend_name(),
            entries = count,
            "Loaded preferences"
        );
    }

    fn finish_load(&self) {
        self.loaded.store(true, Ordering::Release);
        *self.state.lock() = LoadState::Loaded;
        self.state_changed.notify_all();
    }

    fn wait_loaded(&self) {
        let mut state = self.state.lock();
        while *state != LoadState::Loaded {
            self.state_changed.wait(&mut state);
        }
    }
}

/// Moves the load to `Loaded` and wakes waiters when dropped.
struct MarkLoaded<'a>(&'a Shared);

impl Drop for MarkLoaded<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!(
                backend = self.0.persister.backend_name(),
                "Load panicked; continuing with what was read"
            );
        }
        self.0.finish_load();
    }
}

/// Cached key-value store with batched, asynchronous persistence.
///
/// Reads are served from an in-memory cache. Writes are staged with
/// [`put`](Self::put) and become visible together on [`commit`](Self::commit),
/// which updates the cache immediately and hands the batch to a background
/// worker for persistence. [`remove`](Self::remove) and [`clear`](Self::clear)
/// take effect in the cache at once and are persisted the same way.
///
/// The first operation that needs data loads the backend into the cache.
/// Call [`load`](Self::load) early to warm it in the background.
///
/// # Thread Safety
///
/// All methods take `&self`. Share a store across threads with `Arc`.
///
/// # Example
///
/// ```ignore
/// let prefs = PrefsStore::open("prefs.db")?;
/// prefs.put("name", "Sami").put("age", 23).commit();
///
/// assert_eq!(prefs.get_str("name", "?"), "Sami");
/// assert_eq!(prefs.get("age", 0), 23);
/// ```
pub struct PrefsStore {
    pub(crate) shared: Arc<Shared>,
    pending: DashMap<String, Option<Value>>,
    allow_null: AtomicBool,
    pub(crate) pool: WorkerPool,
}

impl PrefsStore {
    /// Returns a builder with default settings.
    pub fn builder() -> PrefsStoreBuilder {
        PrefsStoreBuilder::new()
    }

    /// Opens an unencrypted store backed by SQLite at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created, or the
    /// worker pool cannot start.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::builder().path(path).build()
    }

    /// Opens a non-persistent store.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot start.
    pub fn memory() -> anyhow::Result<Self> {
        Self::builder()
            .backend(crate::backend::MemoryBackend::new())
            .build()
    }

    pub(crate) fn from_parts(persister: Persister, pool: WorkerPool, allow_null: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache: DashMap::new(),
                loaded: AtomicBool::new(false),
                state: Mutex::new(LoadState::Empty),
                state_changed: Condvar::new(),
                persister,
            }),
            pending: DashMap::new(),
            allow_null: AtomicBool::new(allow_null),
            pool,
        }
    }

    // ---- Loading ----

    /// Loads persisted entries into the cache, at most once per store.
    ///
    /// With `blocking = true` the call returns once the cache is populated,
    /// waiting for a load already in progress. With `blocking = false` the
    /// load runs on a worker and the call returns immediately.
    pub fn load(&self, blocking: bool) {
        if self.shared.loaded.load(Ordering::Acquire) {
            return;
        }
        if self.shared.claim_load() {
            if blocking {
                self.shared.populate();
            } else {
                let shared = Arc::clone(&self.shared);
                self.pool.submit(move || shared.populate());
            }
        } else if blocking {
            self.shared.wait_loaded();
        }
    }

    /// Loads in the background and runs `on_loaded` on a worker afterwards.
    ///
    /// If the store is already loaded the callback still runs on a worker.
    pub fn load_with<F>(&self, on_loaded: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        if shared.claim_load() {
            self.pool.submit(move || {
                shared.populate();
                on_loaded();
            });
        } else {
            self.pool.submit(move || {
                shared.wait_loaded();
                on_loaded();
            });
        }
    }

    /// Current progress of the initial load.
    pub fn load_state(&self) -> LoadState {
        *self.shared.state.lock()
    }

    /// Whether the initial load has finished.
    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.load(Ordering::Acquire)
    }

    /// Loads synchronously only if nobody has started a load. Never waits.
    fn ensure_loaded_for_read(&self) {
        if !self.shared.loaded.load(Ordering::Acquire) && self.shared.claim_load() {
            self.shared.populate();
        }
    }

    // ---- Staging and commit ----

    /// Stages `value` under `key`. Nothing is visible until [`commit`](Self::commit).
    ///
    /// A later put for the same key replaces the earlier one.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.pending.insert(key.into(), Some(value.into()));
        self
    }

    /// Stages a null for `key`.
    ///
    /// On commit a null removes the key when nulls are allowed, and is
    /// dropped otherwise.
    pub fn put_null(&self, key: impl Into<String>) -> &Self {
        self.pending.insert(key.into(), None);
        self
    }

    /// Sets whether staged nulls remove their key on commit.
    pub fn set_allow_null(&self, allow: bool) -> &Self {
        self.allow_null.store(allow, Ordering::Relaxed);
        self
    }

    /// Whether staged nulls remove their key on commit.
    pub fn allow_null(&self) -> bool {
        self.allow_null.load(Ordering::Relaxed)
    }

    /// Number of staged, uncommitted entries.
    pub fn staged(&self) -> usize {
        self.pending.len()
    }

    /// Drops staged entries without committing them.
    pub fn discard(&self) {
        self.pending.clear();
    }

    /// Publishes staged entries to the cache and schedules persistence.
    ///
    /// Returns once the cache reflects the batch. Persistence continues on
    /// a worker; see [`flush`](Self::flush) to wait for it.
    ///
    /// A commit made while a background load runs does not wait for it;
    /// committed values take precedence over loaded rows. Batches that
    /// unset keys do wait, so the load cannot bring them back.
    pub fn commit(&self) {
        let batch = self.drain_pending();
        if batch.is_empty() {
            self.ensure_loaded_for_read();
            return;
        }

        let allow_null = self.allow_null();
        if allow_null && batch.iter().any(|(_, value)| value.is_none()) {
            self.load(true);
        } else {
            self.ensure_loaded_for_read();
        }

        let mut upserts = Vec::with_capacity(batch.len());
        let mut unsets = Vec::new();

        for (key, value) in batch {
            match value {
                Some(value) => {
                    self.shared.cache.insert(key.clone(), value.clone());
                    upserts.push((key, value));
                },
                None if allow_null => {
                    self.shared.cache.remove(&key);
                    unsets.push(key);
                },
                None => tracing::debug!(key = %key, "Dropping staged null"),
            }
        }

        if upserts.is_empty() && unsets.is_empty() {
            return;
        }

        tracing::debug!(upserts = upserts.len(), unsets = unsets.len(), "Committed batch");

        let shared = Arc::clone(&self.shared);
        self.pool
            .submit(move || shared.persister.write_batch(&upserts, &unsets));
    }

    /// Moves staged entries out one key at a time.
    ///
    /// Entries staged concurrently either land in this batch or stay for
    /// the next commit.
    fn drain_pending(&self) -> Vec<(String, Option<Value>)> {
        let keys: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .collect()
    }

    // ---- Reads ----

    /// Returns the value under `key` as `V`, or `default` if the key is
    /// missing or holds a different kind.
    pub fn get<V: FromValue>(&self, key: &str, default: V) -> V {
        self.get_opt(key).unwrap_or(default)
    }

    /// Like [`get`](Self::get) for strings, taking a `&str` default.
    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.get_opt(key).unwrap_or_else(|| default.to_string())
    }

    /// Returns the value under `key` as `V`, if present with that kind.
    pub fn get_opt<V: FromValue>(&self, key: &str) -> Option<V> {
        self.ensure_loaded_for_read();
        self.shared
            .cache
            .get(key)
            .and_then(|v| V::from_value(v.value()))
    }

    /// Returns the cached value under `key` regardless of kind.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.get_opt(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ensure_loaded_for_read();
        self.shared.cache.contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.ensure_loaded_for_read();
        self.shared.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.ensure_loaded_for_read();
        let mut keys: Vec<String> = self.shared.cache.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Copy of every cached entry.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.ensure_loaded_for_read();
        self.shared
            .cache
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    // ---- Removal ----

    /// Removes `key` from the cache now and from the backend in the background.
    ///
    /// Staged entries are not touched.
    pub fn remove(&self, key: &str) {
        self.load(true);
        self.shared.cache.remove(key);

        let shared = Arc::clone(&self.shared);
        let key = key.to_string();
        self.pool.submit(move || shared.persister.delete(&key));
    }

    /// Empties the cache now and the backend table in the background.
    pub fn clear(&self) {
        self.load(true);
        self.shared.cache.clear();

        let shared = Arc::clone(&self.shared);
        self.pool.submit(move || shared.persister.delete_all());
    }

    // ---- Persistence control ----

    /// Blocks until every scheduled write has reached the backend.
    pub fn flush(&self) {
        self.pool.flush_timeout(None);
    }

    /// Like [`flush`](Self::flush) with a deadline. Returns `false` on timeout.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.pool.flush_timeout(Some(timeout))
    }

    /// Number of scheduled writes not yet finished.
    pub fn pending_writes(&self) -> usize {
        self.pool.inflight().current()
    }

    /// Name of the configured backend.
    pub fn backend_name(&self) -> &'static str {
        self.shared.persister.backend_name()
    }

    /// Name of the configured cipher, if values are encrypted.
    pub fn cipher_name(&self) -> Option<&'static str> {
        self.shared.persister.cipher_name()
    }

    /// Number of persistence workers.
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }
}

impl std::fmt::Debug for PrefsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefsStore")
            .field("backend", &self.backend_name())
            .field("cipher", &self.cipher_name())
            .field("load_state", &self.load_state())
            .field("cached", &self.shared.cache.len())
            .field("staged", &self.pending.len())
            .finish()
    }
}
