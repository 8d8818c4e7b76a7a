//! Taskmill - a job-dispatch engine.
//!
//! This library keeps a fleet of workers fed from a pluggable source of
//! pending work. A single control loop repeatedly asks the job source
//! "what work is next?", hands each item to a bounded pool of concurrent
//! workers, and backs off with an interruptible sleep whenever the source
//! runs dry - all while staying responsive to a shutdown request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TaskManager                            │
//! │  Control loop: pull items, submit, idle, watch the quit flag│
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ JobSource   │  │ WorkerPool  │  │ ResponsiveSleeper   │  │
//! │  │ Adapter     │  │ (bounded)   │  │ (checkpointed)      │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Job item**: one opaque unit of work pulled from the job source. The
//!   engine never inspects item contents.
//!
//! - **Pass**: one full traversal of the job source's sequence, from first
//!   item to exhaustion or to the quit flag being set.
//!
//! - **Task function**: the [`TaskFunc`] invoked per item on a worker.
//!   Failures are isolated per item: logged with the worker's identity and
//!   discarded, never propagated to the control loop.
//!
//! - **Quit flag**: the single cancellation signal, shared by the control
//!   loop, the responsive sleep, and any external collaborator (for example
//!   a signal handler). Setting it is the only way the loop terminates.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use taskmill::{task_fn, JobSource, ManagerConfig, TaskManager};
//!
//! let mut manager = TaskManager::builder()
//!     .config(ManagerConfig::default())
//!     .source(JobSource::factory(|| pending_reports().into_iter()))
//!     .task(Arc::new(task_fn(|report| process(report))))
//!     .build()?;
//!
//! let quit = manager.quit_flag();
//! // wire `quit.set()` to SIGTERM handling, then:
//! manager.blocking_start(None).await;
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod manager;
pub mod pool;
pub mod quit;
pub mod sleep;
pub mod source;
pub mod task;

pub use config::{
    ManagerConfig, DEFAULT_IDLE_DELAY, DEFAULT_QUEUE_CAPACITY, DEFAULT_WAIT_LOG_INTERVAL,
    DEFAULT_WORKER_COUNT,
};
pub use error::{ConfigError, SubmitError, TaskError};
pub use identity::executor_identity;
pub use manager::{DispatchState, StateHandle, TaskManager, TaskManagerBuilder};
pub use pool::{PoolStats, WorkerPool};
pub use quit::QuitFlag;
pub use sleep::{responsive_sleep, ResponsiveSleeper, SleepFuture, Sleeper, CHECKPOINT_INTERVAL};
pub use source::{JobSource, Pass};
pub use task::{task_fn, NoopTask, TaskFn, TaskFunc, TaskFuture};

/// Version of the taskmill library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
