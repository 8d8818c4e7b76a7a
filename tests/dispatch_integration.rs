//! Integration tests for the dispatch engine.
//!
//! These tests verify the complete dispatch workflow including:
//! - All three job-source shapes dispatching every item exactly once,
//!   in production order
//! - Quit responsiveness before and during a pass
//! - Idle-only invocation of the waiting callback
//! - Submission-timeout retry without item loss
//! - Restart after resetting the quit flag

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use taskmill::{
    task_fn, DispatchState, JobSource, ManagerConfig, QuitFlag, SleepFuture, Sleeper, StateHandle,
    TaskError, TaskFunc, TaskFuture, TaskManager,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("taskmill=debug")
        .with_test_writer()
        .try_init();
}

/// Single worker keeps execution order equal to submission order.
fn serial_config() -> ManagerConfig {
    ManagerConfig {
        idle_delay: Duration::from_millis(10),
        worker_count: 1,
        queue_capacity: 8,
        ..ManagerConfig::default()
    }
}

/// Fake sleeper that counts invocations and sets quit after a threshold.
///
/// Stands in for the responsive sleep the way the production loop is
/// exercised from outside: idling is observable, and shutdown can be
/// driven from the idle path.
struct CountingSleeper {
    calls: Arc<AtomicUsize>,
    quit_after: usize,
}

impl Sleeper for CountingSleeper {
    fn sleep<'a>(
        &'a self,
        quit: &'a QuitFlag,
        _duration: Duration,
        _wait_log_interval: u32,
        _wait_reason: &'a str,
    ) -> SleepFuture<'a> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.quit_after {
                quit.set();
            }
        })
    }
}

/// Task that records each item in arrival order.
fn recorder_task(
    recorded: Arc<Mutex<Vec<i32>>>,
) -> Arc<dyn TaskFunc<i32>> {
    Arc::new(task_fn(move |item: i32| {
        recorded.lock().unwrap().push(item);
        Ok(())
    }))
}

/// Task that records items after holding its worker for a fixed delay.
struct SlowRecorder {
    recorded: Arc<Mutex<Vec<i32>>>,
    delay: Duration,
}

impl TaskFunc<i32> for SlowRecorder {
    fn run(&self, item: i32) -> TaskFuture<'_> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.recorded.lock().unwrap().push(item);
            Ok(())
        })
    }
}

async fn run_with_guard(manager: &mut TaskManager<i32>, waiting: Option<&mut (dyn FnMut() + Send)>) {
    tokio::time::timeout(Duration::from_secs(10), manager.blocking_start(waiting))
        .await
        .expect("dispatch loop failed to stop");
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_stream_source_dispatches_each_item_exactly_once_in_order() {
    init_tracing();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sleeper_calls = Arc::new(AtomicUsize::new(0));
    let waiting_calls = Arc::new(AtomicUsize::new(0));

    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::stream(0..5))
        .task(recorder_task(Arc::clone(&recorded)))
        .sleeper(Arc::new(CountingSleeper {
            calls: Arc::clone(&sleeper_calls),
            quit_after: 1,
        }))
        .build()
        .unwrap();

    let waiting_counter = Arc::clone(&waiting_calls);
    let mut waiting = move || {
        waiting_counter.fetch_add(1, Ordering::SeqCst);
    };

    run_with_guard(&mut manager, Some(&mut waiting)).await;

    // One busy pass dispatching everything, one empty pass that idles.
    assert_eq!(*recorded.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(waiting_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper_calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), taskmill::DispatchState::Stopped);
}

#[tokio::test]
async fn test_fixed_source_replays_in_order_every_pass() {
    init_tracing();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let waiting_calls = Arc::new(AtomicUsize::new(0));
    let quit = QuitFlag::new();

    let task_quit = quit.clone();
    let task_recorded = Arc::clone(&recorded);
    let task = Arc::new(task_fn(move |item: i32| {
        let mut items = task_recorded.lock().unwrap();
        items.push(item);
        if items.len() >= 10 {
            task_quit.set();
        }
        Ok(())
    }));

    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::fixed(vec![1, 2, 3]))
        .task(task)
        .quit_flag(quit)
        .build()
        .unwrap();

    let waiting_counter = Arc::clone(&waiting_calls);
    let mut waiting = move || {
        waiting_counter.fetch_add(1, Ordering::SeqCst);
    };

    run_with_guard(&mut manager, Some(&mut waiting)).await;

    // The fixed sequence repeats identically each pass; items already
    // queued when quit landed may still drain, so assert the prefix.
    let items = recorded.lock().unwrap();
    assert!(items.len() >= 10);
    assert_eq!(&items[..10], &[1, 2, 3, 1, 2, 3, 1, 2, 3, 1]);

    // The source is never empty, so idling never triggers.
    assert_eq!(waiting_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_factory_source_reinvoked_each_pass() {
    init_tracing();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let factory_invocations = Arc::new(AtomicUsize::new(0));
    let quit = QuitFlag::new();

    let invocation_counter = Arc::clone(&factory_invocations);
    let source = JobSource::factory(move || {
        invocation_counter.fetch_add(1, Ordering::SeqCst);
        0..3
    });

    let task_quit = quit.clone();
    let task_recorded = Arc::clone(&recorded);
    let task = Arc::new(task_fn(move |item: i32| {
        let mut items = task_recorded.lock().unwrap();
        items.push(item);
        if items.len() >= 6 {
            task_quit.set();
        }
        Ok(())
    }));

    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(source)
        .task(task)
        .quit_flag(quit)
        .build()
        .unwrap();

    run_with_guard(&mut manager, None).await;

    let items = recorded.lock().unwrap();
    assert!(items.len() >= 6);
    assert_eq!(&items[..6], &[0, 1, 2, 0, 1, 2]);
    assert!(factory_invocations.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_preset_quit_dispatches_nothing() {
    init_tracing();
    let dispatched = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&dispatched);
    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::fixed(0..100))
        .task(Arc::new(task_fn(move |_: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })))
        .build()
        .unwrap();

    manager.quit_flag().set();

    tokio::time::timeout(Duration::from_secs(1), manager.blocking_start(None))
        .await
        .expect("pre-quit start should return promptly");

    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    assert_eq!(manager.state(), taskmill::DispatchState::Stopped);
}

#[tokio::test]
async fn test_waiting_func_invoked_once_per_empty_pass() {
    init_tracing();
    let dispatched = Arc::new(AtomicUsize::new(0));
    let sleeper_calls = Arc::new(AtomicUsize::new(0));
    let waiting_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&dispatched);
    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::fixed(Vec::<i32>::new()))
        .task(Arc::new(task_fn(move |_: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })))
        .sleeper(Arc::new(CountingSleeper {
            calls: Arc::clone(&sleeper_calls),
            quit_after: 3,
        }))
        .build()
        .unwrap();

    let waiting_counter = Arc::clone(&waiting_calls);
    let mut waiting = move || {
        waiting_counter.fetch_add(1, Ordering::SeqCst);
    };

    run_with_guard(&mut manager, Some(&mut waiting)).await;

    // Three empty passes before the third sleep set quit: the callback
    // fires exactly once per idle pass, and no items ever dispatch.
    assert_eq!(waiting_calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper_calls.load(Ordering::SeqCst), 3);
    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_busy_loop_never_invokes_waiting_func() {
    init_tracing();
    let dispatched = Arc::new(AtomicUsize::new(0));
    let waiting_calls = Arc::new(AtomicUsize::new(0));
    let quit = QuitFlag::new();

    let task_quit = quit.clone();
    let counter = Arc::clone(&dispatched);
    let task = Arc::new(task_fn(move |_: i32| {
        if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 10 {
            task_quit.set();
        }
        Ok(())
    }));

    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::factory(|| std::iter::once(7)))
        .task(task)
        .quit_flag(quit)
        .build()
        .unwrap();

    let waiting_counter = Arc::clone(&waiting_calls);
    let mut waiting = move || {
        waiting_counter.fetch_add(1, Ordering::SeqCst);
    };

    run_with_guard(&mut manager, Some(&mut waiting)).await;

    assert!(dispatched.load(Ordering::SeqCst) >= 10);
    assert_eq!(waiting_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_submit_timeout_retries_without_loss_or_duplication() {
    init_tracing();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sleeper_calls = Arc::new(AtomicUsize::new(0));

    // Slow worker, one-slot queue, and a short submission timeout force
    // the loop through the saturation/retry path for nearly every item.
    let config = ManagerConfig {
        idle_delay: Duration::from_millis(10),
        worker_count: 1,
        queue_capacity: 1,
        submit_timeout: Some(Duration::from_millis(5)),
        ..ManagerConfig::default()
    };

    let mut manager = TaskManager::builder()
        .config(config)
        .source(JobSource::stream(0..8))
        .task(Arc::new(SlowRecorder {
            recorded: Arc::clone(&recorded),
            delay: Duration::from_millis(20),
        }))
        .sleeper(Arc::new(CountingSleeper {
            calls: Arc::clone(&sleeper_calls),
            quit_after: 1,
        }))
        .build()
        .unwrap();

    run_with_guard(&mut manager, None).await;

    assert_eq!(*recorded.lock().unwrap(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn test_failing_items_do_not_stop_the_loop() {
    init_tracing();
    let succeeded = Arc::new(AtomicUsize::new(0));
    let sleeper_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&succeeded);
    let task = Arc::new(task_fn(move |item: i32| {
        if item % 2 == 1 {
            return Err(TaskError::new(format!("rejecting odd item {item}")));
        }
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::stream(0..6))
        .task(task)
        .sleeper(Arc::new(CountingSleeper {
            calls: Arc::clone(&sleeper_calls),
            quit_after: 1,
        }))
        .build()
        .unwrap();

    run_with_guard(&mut manager, None).await;

    // Odd items failed and were discarded; even items all completed and
    // the loop only stopped via quit.
    assert_eq!(succeeded.load(Ordering::SeqCst), 3);
    assert_eq!(manager.state(), taskmill::DispatchState::Stopped);
}

#[tokio::test]
async fn test_state_handle_observes_idle_wait_mid_run() {
    init_tracing();

    /// Sleeper that samples the loop state at idle time, then quits.
    struct StateProbeSleeper {
        state: Arc<OnceLock<StateHandle>>,
        seen: Arc<Mutex<Vec<DispatchState>>>,
    }

    impl Sleeper for StateProbeSleeper {
        fn sleep<'a>(
            &'a self,
            quit: &'a QuitFlag,
            _duration: Duration,
            _wait_log_interval: u32,
            _wait_reason: &'a str,
        ) -> SleepFuture<'a> {
            Box::pin(async move {
                if let Some(handle) = self.state.get() {
                    self.seen.lock().unwrap().push(handle.get());
                }
                quit.set();
            })
        }
    }

    let state_cell = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut manager = TaskManager::<i32>::builder()
        .config(serial_config())
        .source(JobSource::fixed(Vec::<i32>::new()))
        .sleeper(Arc::new(StateProbeSleeper {
            state: Arc::clone(&state_cell),
            seen: Arc::clone(&seen),
        }))
        .build()
        .unwrap();

    let observer = manager.state_handle();
    state_cell.set(observer.clone()).unwrap();
    assert_eq!(observer.get(), DispatchState::Stopped);

    run_with_guard(&mut manager, None).await;

    // The idle sleep saw the loop in IdleWait through the shared handle,
    // and the handle reports Stopped once blocking_start returns.
    assert_eq!(*seen.lock().unwrap(), vec![DispatchState::IdleWait]);
    assert_eq!(observer.get(), DispatchState::Stopped);
    assert_eq!(manager.state(), DispatchState::Stopped);
}

#[tokio::test]
async fn test_restart_after_reset_behaves_like_fresh_run() {
    init_tracing();
    let dispatched = Arc::new(AtomicUsize::new(0));
    let quit = QuitFlag::new();

    let task_quit = quit.clone();
    let counter = Arc::clone(&dispatched);
    let task = Arc::new(task_fn(move |_: i32| {
        counter.fetch_add(1, Ordering::SeqCst);
        task_quit.set();
        Ok(())
    }));

    let mut manager = TaskManager::builder()
        .config(serial_config())
        .source(JobSource::factory(|| std::iter::once(1)))
        .task(task)
        .quit_flag(quit.clone())
        .build()
        .unwrap();

    run_with_guard(&mut manager, None).await;
    let first_run = dispatched.load(Ordering::SeqCst);
    assert!(first_run >= 1);
    assert_eq!(manager.state(), taskmill::DispatchState::Stopped);

    quit.reset();

    run_with_guard(&mut manager, None).await;
    assert!(dispatched.load(Ordering::SeqCst) > first_run);
    assert_eq!(manager.state(), taskmill::DispatchState::Stopped);
}
