//! Dispatch loop - the orchestrator tying the engine together.
//!
//! [`TaskManager::blocking_start`] runs the control loop on the calling
//! task: pull one pass of items from the job source, submit each to the
//! worker pool, idle with a responsive sleep when the source is empty,
//! and stop only when the quit flag is set.

use crate::config::ManagerConfig;
use crate::error::{ConfigError, SubmitError};
use crate::pool::WorkerPool;
use crate::quit::QuitFlag;
use crate::sleep::{ResponsiveSleeper, Sleeper};
use crate::source::JobSource;
use crate::task::{NoopTask, TaskFunc};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reason string passed to the responsive sleep while idling.
const IDLE_WAIT_REASON: &str = "job source produced no items";

/// Observable state of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Actively pulling and submitting items.
    Dispatching,
    /// The last pass was empty; backing off before the next one.
    IdleWait,
    /// The quit flag ended the loop; `blocking_start` has returned (or
    /// the manager has not started yet).
    Stopped,
}

impl DispatchState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Dispatching => 0,
            Self::IdleWait => 1,
            Self::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Dispatching,
            1 => Self::IdleWait,
            _ => Self::Stopped,
        }
    }
}

/// Cloneable, read-only view of a manager's loop state.
///
/// `blocking_start` holds the manager exclusively for the whole run, so
/// outside observers (health checks, heartbeats, tests) watch the loop
/// through this handle, the same way collaborators share the
/// [`QuitFlag`].
#[derive(Clone, Debug)]
pub struct StateHandle {
    inner: Arc<AtomicU8>,
}

impl StateHandle {
    fn new() -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(DispatchState::Stopped.as_u8())),
        }
    }

    fn store(&self, state: DispatchState) {
        self.inner.store(state.as_u8(), Ordering::Relaxed);
    }

    /// Current loop state.
    pub fn get(&self) -> DispatchState {
        DispatchState::from_u8(self.inner.load(Ordering::Relaxed))
    }
}

/// The dispatch engine orchestrator.
///
/// Owns the job source, the task function, the quit flag, and the idle
/// sleeper. The worker pool is created per run inside
/// [`blocking_start`](TaskManager::blocking_start), so a stopped manager
/// carries no leftover run state and can be restarted after
/// [`QuitFlag::reset`].
pub struct TaskManager<T: Clone + Send + 'static> {
    config: ManagerConfig,
    source: JobSource<T>,
    task: Arc<dyn TaskFunc<T>>,
    quit: QuitFlag,
    sleeper: Arc<dyn Sleeper>,
    state: StateHandle,
}

impl<T: Clone + Send + 'static> TaskManager<T> {
    /// Creates a manager after validating the configuration.
    ///
    /// Configuration problems surface here, before the loop can start.
    pub fn new(
        config: ManagerConfig,
        source: JobSource<T>,
        task: Arc<dyn TaskFunc<T>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            task,
            quit: QuitFlag::new(),
            sleeper: Arc::new(ResponsiveSleeper),
            state: StateHandle::new(),
        })
    }

    /// Returns a builder for assembling a manager piecewise.
    pub fn builder() -> TaskManagerBuilder<T> {
        TaskManagerBuilder::new()
    }

    /// Returns a handle to this manager's quit flag.
    ///
    /// Any collaborator may `set()` it to request shutdown; `reset()`
    /// re-arms a stopped manager.
    pub fn quit_flag(&self) -> QuitFlag {
        self.quit.clone()
    }

    /// Current loop state.
    pub fn state(&self) -> DispatchState {
        self.state.get()
    }

    /// Returns a shared handle for observing the loop state while
    /// `blocking_start` holds the manager.
    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Runs the dispatch loop to completion on the calling task.
    ///
    /// Returns once the quit flag is observed, after the worker pool has
    /// drained: in-flight and already-queued items run to completion, the
    /// un-pulled remainder of the current pass is abandoned.
    ///
    /// `waiting_func` is invoked only when a pass produced zero items,
    /// immediately before the idle sleep - never while items are being
    /// dispatched. Callers use it to tell "no work available" apart from
    /// "currently busy" (a heartbeat, typically).
    ///
    /// Task failures never terminate the loop; they are contained and
    /// logged inside the pool. The only exit is the quit flag.
    pub async fn blocking_start(&mut self, mut waiting_func: Option<&mut (dyn FnMut() + Send)>) {
        let quit = self.quit.clone();
        let submit_timeout = self.config.submit_timeout;
        let pool = WorkerPool::new(&self.config, Arc::clone(&self.task));

        self.state.store(DispatchState::Dispatching);
        info!(
            workers = self.config.worker_count,
            queue_capacity = self.config.queue_capacity,
            "Dispatch loop started"
        );

        while !quit.is_set() {
            self.state.store(DispatchState::Dispatching);
            let mut dispatched = 0usize;

            {
                let mut pass = self.source.next_pass();
                while let Some(pulled) = pass.next() {
                    if quit.is_set() {
                        debug!("Quit observed mid-pass, abandoning the remainder");
                        break;
                    }

                    let mut item = pulled;
                    loop {
                        match pool.submit(item, submit_timeout).await {
                            Ok(()) => {
                                dispatched += 1;
                                break;
                            }
                            Err(SubmitError::Timeout(returned)) => {
                                warn!(
                                    timeout_ms = submit_timeout
                                        .map(|t| t.as_millis() as u64)
                                        .unwrap_or(0),
                                    "Worker pool saturated, retrying submission"
                                );
                                if quit.is_set() {
                                    break;
                                }
                                item = returned;
                            }
                            Err(SubmitError::Closed(_)) => {
                                // Workers only exit when the intake closes, so
                                // this indicates the runtime is tearing down.
                                error!("Worker pool intake closed, stopping dispatch");
                                quit.set();
                                break;
                            }
                        }
                    }

                    if quit.is_set() {
                        break;
                    }
                }
            }

            if quit.is_set() {
                break;
            }

            if dispatched == 0 {
                self.state.store(DispatchState::IdleWait);
                debug!(
                    idle_delay_ms = self.config.idle_delay.as_millis() as u64,
                    "Pass produced no items, idling"
                );
                if let Some(f) = waiting_func.as_mut() {
                    f();
                }
                self.sleeper
                    .sleep(
                        &quit,
                        self.config.idle_delay,
                        self.config.wait_log_interval,
                        IDLE_WAIT_REASON,
                    )
                    .await;
            } else {
                debug!(dispatched, "Pass complete");
            }
        }

        info!("Quit observed, draining worker pool");
        let stats = pool.join().await;
        self.state.store(DispatchState::Stopped);
        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Dispatch loop stopped"
        );
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for TaskManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("state", &self.state.get())
            .field("quit", &self.quit.is_set())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`TaskManager`].
///
/// The task function defaults to [`NoopTask`] and the quit flag to a
/// fresh one; the job source must be supplied. Injectable sleeper and
/// quit flag exist so tests (and embedders with their own shutdown
/// wiring) can take over those seams.
pub struct TaskManagerBuilder<T> {
    config: ManagerConfig,
    source: Option<JobSource<T>>,
    task: Option<Arc<dyn TaskFunc<T>>>,
    sleeper: Arc<dyn Sleeper>,
    quit: Option<QuitFlag>,
}

impl<T: Clone + Send + 'static> TaskManagerBuilder<T> {
    fn new() -> Self {
        Self {
            config: ManagerConfig::default(),
            source: None,
            task: None,
            sleeper: Arc::new(ResponsiveSleeper),
            quit: None,
        }
    }

    /// Sets the engine configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the job source.
    pub fn source(mut self, source: JobSource<T>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the task function.
    pub fn task(mut self, task: Arc<dyn TaskFunc<T>>) -> Self {
        self.task = Some(task);
        self
    }

    /// Replaces the idle sleeper.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Supplies an externally created quit flag.
    pub fn quit_flag(mut self, quit: QuitFlag) -> Self {
        self.quit = Some(quit);
        self
    }

    /// Finalizes the manager, validating the configuration.
    pub fn build(self) -> Result<TaskManager<T>, ConfigError> {
        self.config.validate()?;
        let source = self.source.ok_or(ConfigError::MissingJobSource)?;
        Ok(TaskManager {
            config: self.config,
            source,
            task: self.task.unwrap_or_else(|| Arc::new(NoopTask)),
            quit: self.quit.unwrap_or_default(),
            sleeper: self.sleeper,
            state: StateHandle::new(),
        })
    }
}
