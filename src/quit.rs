//! Shutdown flag shared across the dispatch loop, sleeps, and collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable shutdown flag for one dispatch engine instance.
///
/// This is the single cancellation signal: the control loop checks it
/// before every submission, the responsive sleep checks it at every
/// checkpoint, and any collaborator (typically a signal handler) may set
/// it to request shutdown.
///
/// The contract is single-writer-many-readers: one party flips the flag,
/// everyone else only reads it. Relaxed ordering is sufficient - a delayed
/// observation costs at most one sleep checkpoint of extra latency, never
/// an incorrect dispatch.
///
/// The flag is scoped to its [`TaskManager`](crate::manager::TaskManager),
/// not process-global, so independent dispatch loops can coexist in one
/// process. [`reset`](QuitFlag::reset) re-arms a stopped manager for
/// another run.
#[derive(Clone, Debug, Default)]
pub struct QuitFlag {
    inner: Arc<AtomicBool>,
}

impl QuitFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn set(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    /// Returns whether shutdown has been requested.
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }

    /// Clears the flag so the owning manager can be started again.
    pub fn reset(&self) {
        self.inner.store(false, Ordering::Relaxed);
    }
}
