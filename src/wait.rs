//! Cooperative wait on a condition
//!
//! Hosts open files asynchronously and only expose a "still loading" flag.
//! [`wait_until`] re-checks a predicate on a fixed cadence, sleeping between
//! checks so the runtime can process other work. It never blocks the thread.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The predicate held.
    Ready,
    /// The session's token was cancelled first.
    Cancelled,
    /// The deadline passed with the predicate still false.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until ready or cancelled.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: None,
        }
    }
}

/// Resolve once `ready` returns true. The predicate is checked immediately,
/// then again after every `settings.interval`.
pub async fn wait_until<P>(
    mut ready: P,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> WaitOutcome
where
    P: FnMut() -> bool,
{
    let deadline = settings.timeout.map(|timeout| Instant::now() + timeout);
    let mut checks = 0u64;

    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        checks += 1;
        if ready() {
            tracing::trace!(checks, "wait condition met");
            return WaitOutcome::Ready;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return WaitOutcome::TimedOut;
        }

        tokio::select! {
            _ = cancel.cancelled() => return WaitOutcome::Cancelled,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}
