//! Worker pool - a fixed set of concurrent execution units.
//!
//! Workers pull submitted items from one bounded queue and invoke the
//! configured task function. Per-item execution is isolated: a failing
//! item is logged with the worker's identity and discarded; it never
//! affects other in-flight or queued items, nor the pool's availability.
//!
//! Items execute concurrently, so completion order is unspecified. The
//! pool reports nothing per-item back to the control loop - only the
//! aggregate completion bookkeeping in [`PoolStats`].

use crate::config::ManagerConfig;
use crate::error::SubmitError;
use crate::identity::executor_identity;
use crate::task::TaskFunc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Aggregate completion bookkeeping for one pool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Items whose task function returned `Ok`.
    pub completed: u64,
    /// Items whose task function returned `Err` (logged and discarded).
    pub failed: u64,
}

/// Fixed-size pool of workers executing one task function.
pub struct WorkerPool<T> {
    tx: mpsc::Sender<T>,
    workers: Vec<JoinHandle<()>>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawns `config.worker_count` workers sharing one submission queue
    /// of `config.queue_capacity` slots.
    pub fn new(config: &ManagerConfig, task: Arc<dyn TaskFunc<T>>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let completed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let workers = (0..config.worker_count)
            .map(|index| {
                tokio::spawn(worker_loop(
                    index,
                    Arc::clone(&rx),
                    Arc::clone(&task),
                    Arc::clone(&completed),
                    Arc::clone(&failed),
                ))
            })
            .collect();

        Self {
            tx,
            workers,
            completed,
            failed,
        }
    }

    /// Submits one item for execution.
    ///
    /// With no timeout this blocks until a queue slot frees (back-pressure
    /// on the caller). With a timeout, a saturated pool returns
    /// [`SubmitError::Timeout`] carrying the item back so the caller can
    /// retry without losing it.
    pub async fn submit(
        &self,
        item: T,
        timeout: Option<Duration>,
    ) -> Result<(), SubmitError<T>> {
        match timeout {
            None => self
                .tx
                .send(item)
                .await
                .map_err(|rejected| SubmitError::Closed(rejected.0)),
            Some(limit) => self
                .tx
                .send_timeout(item, limit)
                .await
                .map_err(|rejected| match rejected {
                    SendTimeoutError::Timeout(item) => SubmitError::Timeout(item),
                    SendTimeoutError::Closed(item) => SubmitError::Closed(item),
                }),
        }
    }

    /// Closes the intake and waits for the workers to finish.
    ///
    /// Already-queued and in-flight items run to completion; no new
    /// submissions are accepted.
    pub async fn join(self) -> PoolStats {
        let Self {
            tx,
            workers,
            completed,
            failed,
        } = self;

        drop(tx);
        for handle in workers {
            let _ = handle.await;
        }

        PoolStats {
            completed: completed.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        }
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .field("failed", &self.failed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

async fn worker_loop<T: Send + 'static>(
    index: usize,
    queue: Arc<Mutex<mpsc::Receiver<T>>>,
    task: Arc<dyn TaskFunc<T>>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
) {
    debug!(worker = index, "Worker started");

    loop {
        // Holding the lock across recv is intentional: exactly one idle
        // worker waits on the queue at a time, the rest wait on the lock.
        let item = { queue.lock().await.recv().await };
        let Some(item) = item else {
            break;
        };

        match task.run(item).await {
            Ok(()) => {
                completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    worker = %executor_identity(),
                    error = %err,
                    "Task failed, item discarded"
                );
            }
        }
    }

    debug!(worker = index, "Worker exiting, intake closed");
}
