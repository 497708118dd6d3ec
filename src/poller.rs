//! Scheduled-refresh primitive: a cancellable recurring fetch with
//! at-most-one-in-flight semantics. Failures are swallowed here (logged, not
//! surfaced) so transient network blips never interrupt badge UX, and
//! stopping the handle guarantees no result delivery afterwards.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;

pub struct Poller;

impl Poller {
    /// Spawn a recurring fetch on the given cadence. The first fetch runs
    /// immediately. A tick that elapses while a fetch is still in flight is
    /// skipped, never queued, and an erroring fetch neither resets nor
    /// extends the schedule.
    pub fn spawn<T, F, Fut, R>(
        name: &'static str,
        interval: Duration,
        mut fetch: F,
        mut on_result: R,
    ) -> PollerHandle
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        R: FnMut(T) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let result = tokio::select! {
                    // Cancellation mid-fetch drops the in-flight future.
                    _ = task_token.cancelled() => break,
                    r = fetch() => r,
                };
                // Re-check after the fetch resolves: a stop that raced the
                // response discards the result rather than delivering late.
                if task_token.is_cancelled() {
                    break;
                }
                match result {
                    Ok(value) => on_result(value),
                    Err(e) => tracing::debug!(poller = name, err = %e, "poll.tick_failed"),
                }
            }
            tracing::debug!(poller = name, "poll.stopped");
        });
        PollerHandle { name, token, join: Some(join) }
    }
}

/// Owning start/stop handle. Dropping it cancels the task, so teardown is
/// structural: a component that owned a poller cannot leak its timer.
pub struct PollerHandle {
    name: &'static str,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn name(&self) -> &'static str { self.name }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool { self.token.is_cancelled() }

    /// Stop and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
