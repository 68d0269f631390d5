//! Background idle-session sweeper for Sessiongate.
//!
//! An [`ExpirySweeper`] periodically scans a [`SessionStore`] and evicts
//! every session that has sat unused for longer than the idle timeout.
//! It is the only component that removes sessions on its own.
//!
//! # Timing
//!
//! The sweep loop is driven by [`tokio::time::interval`]:
//! - the first tick completes immediately, so a sweep runs at startup;
//! - missed ticks are skipped ([`MissedTickBehavior::Skip`]), so a stalled
//!   runtime never triggers a burst of back-to-back sweeps.
//!
//! # Races with in-flight calls
//!
//! A call that resolved a session just before the sweeper removed it keeps
//! its handle and completes normally. The next call presenting that id sees
//! no session. Each eviction re-checks the idle time under the store's write
//! lock, so a session touched after the scan started is never evicted.
//!
//! ```ignore
//! let store = Arc::new(SessionStore::new());
//! let handle = ExpirySweeper::new(Arc::clone(&store), SweepConfig::default()).spawn();
//! // ... serve requests ...
//! handle.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sessiongate_session::{SessionConfig, SessionId, SessionStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between sweeps. Default: 60 s.
    pub interval: Duration,
    /// Sessions idle for strictly longer than this are evicted. Default: 60 s.
    pub idle_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SweepConfig {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            interval: cfg.sweep_interval(),
            idle_timeout: cfg.idle_timeout(),
        }
    }
}

impl SweepConfig {
    /// Shortest allowed interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Fix out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ExpirySweeper::new`]. A zero interval
    /// would make `tokio::time::interval` panic, so it is raised to
    /// [`Self::MIN_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "sweep interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters describing the sweeper's work so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Sweeps completed.
    pub total_sweeps: u64,
    /// Sessions evicted across all sweeps.
    pub total_evicted: u64,
    /// Sessions evicted by the most recent sweep.
    pub last_evicted: u64,
}

// ---------------------------------------------------------------------------
// Sweeper
// ---------------------------------------------------------------------------

/// Periodic evictor of idle sessions.
///
/// Use [`sweep_once`](Self::sweep_once) to drive it by hand, or
/// [`spawn`](Self::spawn) to run it as a background task.
pub struct ExpirySweeper {
    store: Arc<SessionStore>,
    config: SweepConfig,
    metrics: Arc<Mutex<SweepMetrics>>,
}

impl ExpirySweeper {
    /// Creates a sweeper over `store`.
    pub fn new(store: Arc<SessionStore>, config: SweepConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis() as u64,
            idle_timeout_ms = config.idle_timeout.as_millis() as u64,
            "expiry sweeper created"
        );
        Self {
            store,
            config,
            metrics: Arc::new(Mutex::new(SweepMetrics::default())),
        }
    }

    /// The effective configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Snapshot of the metrics.
    pub fn metrics(&self) -> SweepMetrics {
        self.metrics.lock().clone()
    }

    /// Runs a single sweep and returns the ids it evicted.
    ///
    /// Never fails: an empty store simply yields an empty list.
    pub fn sweep_once(&self) -> Vec<SessionId> {
        let threshold = self.config.idle_timeout;
        let evicted: Vec<SessionId> = self
            .store
            .snapshot_idle_durations()
            .into_iter()
            .filter(|(_, idle)| *idle > threshold)
            .filter(|(id, _)| self.store.remove_if_idle(id, threshold))
            .map(|(id, _)| id)
            .collect();

        let count = evicted.len() as u64;
        {
            let mut metrics = self.metrics.lock();
            metrics.total_sweeps += 1;
            metrics.total_evicted += count;
            metrics.last_evicted = count;
        }

        if count > 0 {
            info!(evicted = count, live = self.store.len(), "sweep evicted idle sessions");
        } else {
            trace!(live = self.store.len(), "sweep found nothing to evict");
        }
        evicted
    }

    /// Moves the sweeper onto a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = Arc::clone(&self.metrics);
        let task = tokio::spawn(self.run(shutdown_rx));
        SweeperHandle {
            shutdown_tx,
            task: Some(task),
            metrics,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("expiry sweeper started");

        loop {
            tokio::select! {
                biased;
                // A dropped sender counts as a shutdown signal too.
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        debug!(sweeps = self.metrics.lock().total_sweeps, "expiry sweeper stopped");
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner of a running sweeper task.
///
/// Dropping the handle aborts the task; call
/// [`shutdown`](Self::shutdown) for a clean stop.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    metrics: Arc<Mutex<SweepMetrics>>,
}

impl SweeperHandle {
    /// Snapshot of the running sweeper's metrics.
    pub fn metrics(&self) -> SweepMetrics {
        self.metrics.lock().clone()
    }

    /// Returns `true` once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signals the task to stop and waits for it.
    ///
    /// A sweep already in progress finishes first.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "expiry sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_zero_interval_is_clamped() {
        let cfg = SweepConfig {
            interval: Duration::ZERO,
            idle_timeout: Duration::from_secs(1),
        }
        .validated();
        assert_eq!(cfg.interval, SweepConfig::MIN_INTERVAL);
    }

    #[test]
    fn test_default_config_matches_session_defaults() {
        let cfg = SweepConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(60));
        assert_eq!(cfg.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_session_config_converts_millis() {
        let cfg = SweepConfig::from(&SessionConfig {
            session_idle_timeout_ms: 1_500,
            sweep_interval_ms: 250,
        });
        assert_eq!(cfg.interval, Duration::from_millis(250));
        assert_eq!(cfg.idle_timeout, Duration::from_millis(1_500));
    }
}
