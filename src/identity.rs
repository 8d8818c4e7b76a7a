//! Worker identity for log and metric correlation.

/// Returns the identity string of the currently executing thread of
/// control, formatted as `"{pid}-{thread_name}"`.
///
/// A pure function of ambient execution context with no side effects. The
/// result is used exclusively for correlating log lines and metrics with
/// the worker that produced them; it never influences scheduling.
pub fn executor_identity() -> String {
    let thread = std::thread::current();
    identity_for(std::process::id(), thread.name().unwrap_or("unnamed"))
}

fn identity_for(pid: u32, thread_name: &str) -> String {
    format!("{pid}-{thread_name}")
}
