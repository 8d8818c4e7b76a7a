//! Dispatch engine configuration.
//!
//! This module contains the [`ManagerConfig`] struct and related constants
//! for configuring the task manager and its worker pool.

use crate::error::ConfigError;
use std::time::Duration;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default delay between passes when the job source is empty.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(5);

/// Default wait-log cadence in sleep checkpoints (0 = silent).
pub const DEFAULT_WAIT_LOG_INTERVAL: u32 = 0;

/// Default number of concurrent workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default worker pool submission queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

// =============================================================================
// Manager Configuration
// =============================================================================

/// Configuration for the dispatch engine.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// How long to back off when a pass produces no items.
    pub idle_delay: Duration,

    /// Emit a diagnostic line every this many sleep checkpoints while
    /// idling. Zero disables wait logging.
    pub wait_log_interval: u32,

    /// Number of concurrent workers in the pool.
    pub worker_count: usize,

    /// Capacity of the pool's submission queue. Submissions block once the
    /// queue is full, providing back-pressure on the control loop.
    pub queue_capacity: usize,

    /// Optional timeout for a single submission attempt against a saturated
    /// pool. `None` blocks until a slot frees; `Some` makes the loop log
    /// and retry, which keeps it observant of the quit flag.
    pub submit_timeout: Option<Duration>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            idle_delay: DEFAULT_IDLE_DELAY,
            wait_log_interval: DEFAULT_WAIT_LOG_INTERVAL,
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            submit_timeout: None,
        }
    }
}

impl ManagerConfig {
    /// Validates the configuration.
    ///
    /// Called at manager construction time so a bad configuration surfaces
    /// before `blocking_start` is ever invoked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkerCount);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}
