//! Error taxonomy for the dispatch engine.
//!
//! Three failure classes exist, each contained at a different layer:
//!
//! - [`ConfigError`]: fatal at setup, surfaced to the caller before the
//!   dispatch loop ever starts.
//! - [`TaskError`]: raised by a task function while executing one item;
//!   recovered inside the worker pool (logged and counted), never
//!   propagated to the dispatch loop.
//! - [`SubmitError`]: a submission against a saturated or closed pool;
//!   a timeout hands the item back so the loop can retry without loss.

use std::fmt;
use thiserror::Error;

/// Invalid dispatch engine configuration.
///
/// Fatal at setup: construction fails before `blocking_start` can run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The worker pool needs at least one worker.
    #[error("worker_count must be at least 1")]
    ZeroWorkerCount,

    /// The submission queue needs at least one slot.
    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,

    /// The builder was finalized without a job source.
    #[error("no job source configured")]
    MissingJobSource,
}

/// A failure raised while executing one job item.
///
/// Task errors are terminal for the item only: the worker logs the error
/// tagged with its identity, discards the item, and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    /// Creates a task error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A rejected worker pool submission, carrying the unaccepted item.
///
/// `Debug`/`Display` are hand-written without bounds on `T` (tokio's
/// channel errors follow the same convention) so opaque job items never
/// need `Debug`.
pub enum SubmitError<T> {
    /// The pool stayed saturated for the whole submission timeout.
    /// The item is returned for retry.
    Timeout(T),

    /// The pool's intake has closed. No further submissions will succeed.
    Closed(T),
}

impl<T> SubmitError<T> {
    /// Recovers the item that was not accepted.
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(item) | Self::Closed(item) => item,
        }
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(_) => write!(f, "Timeout(..)"),
            Self::Closed(_) => write!(f, "Closed(..)"),
        }
    }
}

impl<T> fmt::Display for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(_) => write!(f, "worker pool submission timed out"),
            Self::Closed(_) => write!(f, "worker pool is closed"),
        }
    }
}

impl<T> std::error::Error for SubmitError<T> {}
