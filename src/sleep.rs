//! Responsive sleep - a checkpointed, interruptible delay.
//!
//! This is the sole mechanism by which idle backoff and fast shutdown
//! coexist: without checkpointing, a long idle delay would make shutdown
//! slow; without backoff, an empty job source would cause a busy loop.

use crate::quit::QuitFlag;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

/// Granularity at which a sleep re-checks the quit flag.
pub const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(1);

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Seam for the dispatch loop's idle delay.
///
/// Production code uses [`ResponsiveSleeper`]; tests inject fakes that
/// count invocations or set the quit flag on a schedule.
pub trait Sleeper: Send + Sync {
    /// Sleeps for approximately `duration`, returning early if `quit` is
    /// set. `wait_reason` describes why the caller is idling.
    fn sleep<'a>(
        &'a self,
        quit: &'a QuitFlag,
        duration: Duration,
        wait_log_interval: u32,
        wait_reason: &'a str,
    ) -> SleepFuture<'a>;
}

/// Default [`Sleeper`] backed by [`responsive_sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponsiveSleeper;

impl Sleeper for ResponsiveSleeper {
    fn sleep<'a>(
        &'a self,
        quit: &'a QuitFlag,
        duration: Duration,
        wait_log_interval: u32,
        wait_reason: &'a str,
    ) -> SleepFuture<'a> {
        Box::pin(responsive_sleep(quit, duration, wait_log_interval, wait_reason))
    }
}

/// Blocks for approximately `duration`, checkpointed at
/// [`CHECKPOINT_INTERVAL`] granularity.
///
/// Returns early, within one checkpoint, as soon as `quit` is set. A quit
/// observed mid-sleep is not an error; the sleep simply ends. When
/// `wait_log_interval` is nonzero, a diagnostic line carrying
/// `wait_reason` is emitted every `wait_log_interval` checkpoints so
/// operators can see why the loop is idling.
pub async fn responsive_sleep(
    quit: &QuitFlag,
    duration: Duration,
    wait_log_interval: u32,
    wait_reason: &str,
) {
    let mut remaining = duration;
    let mut checkpoints: u32 = 0;

    while !remaining.is_zero() {
        if quit.is_set() {
            debug!(reason = wait_reason, "Sleep interrupted by quit request");
            return;
        }

        let step = remaining.min(CHECKPOINT_INTERVAL);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
        checkpoints += 1;

        if wait_log_due(wait_log_interval, checkpoints) {
            info!(
                reason = wait_reason,
                waited_secs = checkpoints,
                "Still waiting"
            );
        }
    }
}

/// Whether the wait log line is due at this checkpoint.
///
/// Zero disables wait logging entirely; otherwise the line fires at every
/// `wait_log_interval`-th checkpoint.
fn wait_log_due(wait_log_interval: u32, checkpoints: u32) -> bool {
    wait_log_interval > 0 && checkpoints % wait_log_interval == 0
}
