// Bounded pool of background translation fetches.
//
// Each job is a tokio task. The pool has a fixed capacity; callers check
// `has_capacity()` before dispatching.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::metrics;

#[derive(Debug, Clone)]
pub struct WarmupPool {
    worker_count: usize,
    active_workers: Arc<AtomicUsize>,
}

/// Releases a pool slot when the job ends, including on panic.
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        let now = self.0.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::WARMUP_WORKERS_ACTIVE.set(now as i64);
    }
}

impl WarmupPool {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            active_workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active_workers.load(Ordering::Relaxed) < self.worker_count
    }

    pub fn active_count(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Run `job` on the runtime. Returns false if the pool is at capacity.
    pub fn spawn<F>(&self, job: F) -> bool
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        if !self.has_capacity() {
            return false;
        }
        let now = self.active_workers.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::WARMUP_WORKERS_ACTIVE.set(now as i64);

        let slot = Slot(self.active_workers.clone());
        tokio::spawn(async move {
            let _slot = slot;
            job.await;
        });
        true
    }
}
