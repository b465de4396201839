//! Background execution pool for persistence work.
//!
//! Wraps a private tokio runtime whose blocking pool is capped at the
//! configured worker count. Submitted closures run with `spawn_blocking`, so
//! callers never need a runtime of their own. An in-flight counter backs
//! `flush`, which waits until every submitted unit has finished.

use crate::constants::{MAX_WORKERS, WORKER_THREAD_NAME};
use anyhow::{Context, Result};
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Id of the pool owning the current thread, or 0 outside any pool.
    static CURRENT_POOL: Cell<u64> = const { Cell::new(0) };
}

/// Count of submitted-but-unfinished work units.
#[derive(Default)]
pub(crate) struct Inflight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Inflight {
    fn begin(&self) {
        *self.count.lock() += 1;
    }

    fn end(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    pub(crate) fn current(&self) -> usize {
        *self.count.lock()
    }

    /// Blocks until the count reaches zero or `timeout` elapses.
    ///
    /// Returns `true` if the pool drained.
    pub(crate) fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut count = self.count.lock();
        while *count > 0 {
            match deadline {
                Some(deadline) => {
                    if self.idle.wait_until(&mut count, deadline).timed_out() {
                        return *count == 0;
                    }
                },
                None => self.idle.wait(&mut count),
            }
        }
        true
    }
}

/// Decrements the in-flight count when the work unit ends, even on panic.
struct InflightGuard(Arc<Inflight>);

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.0.end();
    }
}

/// Fixed-size pool running persistence work off the caller's thread.
pub(crate) struct WorkerPool {
    id: u64,
    runtime: Option<Runtime>,
    inflight: Arc<Inflight>,
    workers: usize,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Starts a pool with `workers` threads (clamped to `1..=MAX_WORKERS`).
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built.
    pub(crate) fn new(workers: usize, shutdown_timeout: Duration) -> Result<Self> {
        let workers = workers.clamp(1, MAX_WORKERS);
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name(WORKER_THREAD_NAME)
            .on_thread_start(move || CURRENT_POOL.with(|pool| pool.set(id)))
            .build()
            .context("Failed to start persistence workers")?;

        Ok(Self {
            id,
            runtime: Some(runtime),
            inflight: Arc::new(Inflight::default()),
            workers,
            shutdown_timeout,
        })
    }

    /// Runs `work` on a pool thread. Never blocks the caller.
    pub(crate) fn submit<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            return;
        };
        self.inflight.begin();
        let guard = InflightGuard(Arc::clone(&self.inflight));
        runtime.spawn_blocking(move || {
            let _guard = guard;
            work();
        });
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    pub(crate) fn inflight(&self) -> Arc<Inflight> {
        Arc::clone(&self.inflight)
    }

    /// Waits for outstanding work. Returns `false` on timeout, or
    /// immediately when called from one of this pool's own threads.
    pub(crate) fn flush_timeout(&self, timeout: Option<Duration>) -> bool {
        if self.on_own_thread() {
            tracing::warn!("flush called from a persistence worker; not waiting");
            return self.inflight.current() == 0;
        }
        self.inflight.wait_idle(timeout)
    }
}

impl WorkerPool {
    fn on_own_thread(&self) -> bool {
        CURRENT_POOL.with(Cell::get) == self.id
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.flush_timeout(Some(self.shutdown_timeout)) {
            tracing::warn!(
                pending = self.inflight.current(),
                timeout_ms = self.shutdown_timeout.as_millis() as u64,
                "Persistence workers still busy at shutdown; detaching"
            );
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn current_pool() -> u64 {
        CURRENT_POOL.with(Cell::get)
    }

    #[test]
    fn test_submit_runs_off_thread_and_flushes() {
        let pool = WorkerPool::new(2, Duration::from_secs(1)).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(!pool.on_own_thread());

        for _ in 0..10 {
            let hits = Arc::clone(&hits);
            let id = pool.id;
            pool.submit(move || {
                assert_eq!(current_pool(), id);
                assert_eq!(std::thread::current().name(), Some(WORKER_THREAD_NAME));
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(pool.flush_timeout(Some(Duration::from_secs(5))));
        assert_eq!(hits.load(Ordering::SeqCst), 10);
        assert_eq!(pool.inflight.current(), 0);
    }

    #[test]
    fn test_flush_times_out_on_slow_work() {
        let pool = WorkerPool::new(1, Duration::from_secs(2)).unwrap();
        pool.submit(|| std::thread::sleep(Duration::from_millis(300)));

        assert!(!pool.flush_timeout(Some(Duration::from_millis(10))));
        assert!(pool.flush_timeout(Some(Duration::from_secs(5))));
    }

    #[test]
    fn test_panicking_work_does_not_wedge_flush() {
        let pool = WorkerPool::new(1, Duration::from_secs(1)).unwrap();
        pool.submit(|| panic!("boom"));
        assert!(pool.flush_timeout(Some(Duration::from_secs(5))));
    }

    #[test]
    fn test_single_worker_runs_in_submission_order() {
        let pool = WorkerPool::new(1, Duration::from_secs(1)).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            let order = Arc::clone(&order);
            pool.submit(move || order.lock().push(i));
        }
        pool.flush_timeout(None);

        assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let pool = WorkerPool::new(0, Duration::from_secs(1)).unwrap();
        assert_eq!(pool.workers(), 1);
        let pool = WorkerPool::new(10_000, Duration::from_secs(1)).unwrap();
        assert_eq!(pool.workers(), MAX_WORKERS);
    }

    #[test]
    fn test_drop_waits_for_work() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(2, Duration::from_secs(5)).unwrap();
            for _ in 0..4 {
                let hits = Arc::clone(&hits);
                pool.submit(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    hits.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_flush_from_another_pool_waits() {
        let slow = Arc::new(WorkerPool::new(1, Duration::from_secs(5)).unwrap());
        let other = WorkerPool::new(1, Duration::from_secs(5)).unwrap();
        slow.submit(|| std::thread::sleep(Duration::from_millis(300)));

        let (tx, rx) = std::sync::mpsc::channel();
        let target = Arc::clone(&slow);
        other.submit(move || {
            let drained = target.flush_timeout(Some(Duration::from_secs(5)));
            let _ = tx.send((drained, target.inflight.current()));
        });

        let (drained, pending) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(drained);
        assert_eq!(pending, 0);
        assert!(other.flush_timeout(Some(Duration::from_secs(5))));
    }

    #[test]
    fn test_flush_from_own_worker_returns_immediately() {
        let pool = Arc::new(WorkerPool::new(1, Duration::from_secs(1)).unwrap());
        let (tx, rx) = std::sync::mpsc::channel();
        let inner = Arc::clone(&pool);
        pool.submit(move || {
            let _ = tx.send(inner.flush_timeout(None));
        });

        // The submitting unit is still counted while it runs.
        assert!(!rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert!(pool.flush_timeout(Some(Duration::from_secs(5))));
    }
}
