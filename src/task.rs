//! Task function seam.
//!
//! The dispatch engine treats task execution as opaque: whatever a task
//! does with an item - sanitizing, storing, forwarding - is irrelevant to
//! dispatch. Representing the callable as a single-method trait lets the
//! worker pool apply failure isolation and identity-tagged logging
//! uniformly, without depending on the callable's internal shape.

use crate::error::TaskError;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Boxed future returned by [`TaskFunc::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'a>>;

/// The processing function invoked once per job item on a worker.
///
/// # Example
///
/// ```ignore
/// struct ProcessReport { store: Arc<ReportStore> }
///
/// impl TaskFunc<CrashReport> for ProcessReport {
///     fn run(&self, report: CrashReport) -> TaskFuture<'_> {
///         Box::pin(async move {
///             self.store.save(report).await.map_err(|e| TaskError::new(e.to_string()))
///         })
///     }
/// }
/// ```
pub trait TaskFunc<T>: Send + Sync {
    /// Processes one item. An `Err` marks the item failed; it is logged
    /// by the pool and discarded, never retried by the engine.
    fn run(&self, item: T) -> TaskFuture<'_>;
}

/// Adapter turning a plain synchronous closure into a [`TaskFunc`].
pub struct TaskFn<F> {
    func: F,
}

/// Wraps `func` so it can be used as the engine's task function.
pub fn task_fn<F>(func: F) -> TaskFn<F> {
    TaskFn { func }
}

impl<T, F> TaskFunc<T> for TaskFn<F>
where
    F: Fn(T) -> Result<(), TaskError> + Send + Sync,
{
    fn run(&self, item: T) -> TaskFuture<'_> {
        let result = (self.func)(item);
        Box::pin(async move { result })
    }
}

/// Default task function: consumes and discards each item.
///
/// Useful for smoke-testing a dispatch pipeline before real processing is
/// wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTask;

impl<T> TaskFunc<T> for NoopTask {
    fn run(&self, item: T) -> TaskFuture<'_> {
        drop(item);
        debug!("No-op task consumed an item");
        Box::pin(async { Ok(()) })
    }
}
