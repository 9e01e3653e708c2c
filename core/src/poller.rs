use crate::auth::AuthStatusStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives [`AuthStatusStore`] on a fixed interval.
///
/// Must be started from within a tokio runtime. Dropping a running poller
/// cancels its timer, but [`StatusPoller::stop`] is the way to wait for the
/// task to finish.
pub struct StatusPoller {
    store: AuthStatusStore,
    running: Option<RunningPoll>,
}

struct RunningPoll {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(store: AuthStatusStore) -> Self {
        Self {
            store,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|poll| !poll.handle.is_finished())
    }

    pub fn interval(&self) -> Option<Duration> {
        self.running.as_ref().map(|poll| poll.interval)
    }

    /// Tick immediately, then every `every`. A running timer is replaced.
    pub fn start(&mut self, every: Duration) {
        if let Some(previous) = self.running.take() {
            previous.cancel.cancel();
        }
        let every = every.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(self.store.clone(), every, cancel.clone()));
        tracing::debug!(interval_ms = every.as_millis() as u64, "status poller started");
        self.running = Some(RunningPoll {
            cancel,
            handle,
            interval: every,
        });
    }

    /// Cancel the timer and any tick in flight, then wait for the task.
    pub async fn stop(&mut self) {
        let Some(poll) = self.running.take() else {
            return;
        };
        poll.cancel.cancel();
        if let Err(err) = poll.handle.await {
            if !err.is_cancelled() {
                tracing::warn!(%err, "status poller task ended abnormally");
            }
        }
        tracing::debug!("status poller stopped");
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        if let Some(poll) = self.running.take() {
            poll.cancel.cancel();
        }
    }
}

async fn run(store: AuthStatusStore, every: Duration, cancel: CancellationToken) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // Dropping the joined future on cancellation abandons both requests,
        // so a stopped poller never writes to the store again.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = async { tokio::join!(store.check_status(), store.check_direct()) } => {}
        }
    }
}
