// FIFO queue of identifiers awaiting translation, drained by a background
// warm-up worker.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::metrics;
use crate::translation::{enrich, RetryPolicy, TranslationOracle, TranslationStore};
use crate::worker_pool::WarmupPool;

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub depth: usize,
}

#[derive(Debug, Default)]
struct Inner {
    order: VecDeque<String>,
    queued: HashSet<String>,
}

/// Thread-safe de-duplicating FIFO. An identifier already waiting is not
/// queued twice.
#[derive(Debug, Clone, Default)]
pub struct WarmupQueue {
    inner: Arc<Mutex<Inner>>,
}

impl WarmupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an identifier to the back of the queue. Returns false when it
    /// was already waiting.
    pub fn enqueue(&self, identifier: &str) -> bool {
        let key = identifier.trim().to_lowercase();
        let mut inner = self.lock();
        if !inner.queued.insert(key.clone()) {
            return false;
        }
        inner.order.push_back(key);
        metrics::WARMUP_QUEUE_DEPTH.set(inner.order.len() as i64);
        true
    }

    pub fn dequeue(&self) -> Option<String> {
        let mut inner = self.lock();
        let next = inner.order.pop_front();
        if let Some(id) = &next {
            inner.queued.remove(id);
        }
        metrics::WARMUP_QUEUE_DEPTH.set(inner.order.len() as i64);
        next
    }

    pub fn depth(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus { depth: self.depth() }
    }
}

/// Spawn a background task that polls the queue and hands identifiers to
/// the pool while it has capacity. Already-cached identifiers are dropped.
pub fn spawn_warmup_worker(
    queue: WarmupQueue,
    pool: WarmupPool,
    store: Arc<TranslationStore>,
    oracle: Arc<dyn TranslationOracle>,
    policy: RetryPolicy,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(poll_interval).await;

            while pool.has_capacity() {
                let Some(identifier) = queue.dequeue() else {
                    break;
                };
                if store.is_complete(&identifier) {
                    continue;
                }
                pool.spawn(enrich(store.clone(), oracle.clone(), identifier, policy));
            }
        }
    })
}
