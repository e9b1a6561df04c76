use crate::expiry::{ExpiryStore, TrackedItem};
use crate::metrics;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub mod tasks;

/// Shortest period the poller accepts
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Called with the fresh item list after every successful poll
pub type RefreshHook = Arc<dyn Fn(&[TrackedItem]) + Send + Sync>;

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Refreshed(usize),
    /// A fetch or mutation was already in flight
    Skipped,
    Failed,
}

/// Periodic expiry refresh.
///
/// Each tick awaits its refresh before the next one can start, and a tick
/// that lands while a manual refresh or mutation is in flight is skipped.
pub struct ExpiryPoller {
    store: Arc<ExpiryStore>,
    period: Duration,
    on_refresh: Option<RefreshHook>,
}

impl ExpiryPoller {
    /// `tokio::time::interval` panics on a zero period, so anything shorter
    /// than [`MIN_POLL_PERIOD`] is raised to it.
    pub fn new(store: Arc<ExpiryStore>, period: Duration) -> Self {
        let period = if period < MIN_POLL_PERIOD {
            warn!(
                "Expiry poll period {:?} too short, using {:?}",
                period, MIN_POLL_PERIOD
            );
            MIN_POLL_PERIOD
        } else {
            period
        };

        Self {
            store,
            period,
            on_refresh: None,
        }
    }

    pub fn on_refresh<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[TrackedItem]) + Send + Sync + 'static,
    {
        self.on_refresh = Some(Arc::new(hook));
        self
    }

    /// Spawn the poll loop. The first poll runs immediately.
    pub fn start(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        PollerHandle {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting expiry poller (every {}s)",
            self.period.as_secs_f64()
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            // Dropping the poll future cancels the in-flight fetch
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("Expiry poll cancelled by shutdown");
                    break;
                }
                _ = self.poll_once() => {}
            }
        }

        info!("Expiry poller stopped");
    }

    /// Run one poll now
    pub async fn poll_once(&self) -> PollOutcome {
        match self.store.try_refresh().await {
            None => {
                metrics::record_poll("skipped");
                PollOutcome::Skipped
            }
            Some(Ok(items)) => {
                metrics::record_poll("success");
                if let Some(hook) = &self.on_refresh {
                    hook(&items);
                }
                PollOutcome::Refreshed(items.len())
            }
            Some(Err(e)) => {
                metrics::record_poll("error");
                warn!("Expiry poll failed, retrying next tick: {}", e);
                PollOutcome::Failed
            }
        }
    }
}

/// Owner of a running poller; dropping it aborts the task
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Expiry poller task failed: {}", e);
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
