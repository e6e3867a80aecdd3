//! Probe scheduling and monitor lifecycle

use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::availability::{AvailabilitySnapshot, AvailabilityTracker};
use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::failure_log::{FailureLogStore, FailureRecord};
use crate::probe::HttpProber;

/// Lifecycle states of the probe scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
            MonitorState::Draining => "draining",
            MonitorState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Owns the prober, the counters, and the failure log, and drives the
/// periodic probe loop.
pub struct Monitor {
    config: Config,
    prober: HttpProber,
    availability: Arc<AvailabilityTracker>,
    failure_log: Arc<FailureLogStore>,
    state: RwLock<MonitorState>,
}

impl Monitor {
    /// Build a monitor from a validated configuration.
    pub fn new(
        config: Config,
        availability: Arc<AvailabilityTracker>,
        failure_log: Arc<FailureLogStore>,
    ) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let prober = HttpProber::new(
            config.target_url.clone(),
            config.expected_status_code,
            config.probe_timeout(),
        )?;

        Ok(Self {
            config,
            prober,
            availability,
            failure_log,
            state: RwLock::new(MonitorState::Idle),
        })
    }

    pub async fn state(&self) -> MonitorState {
        *self.state.read().await
    }

    /// Current availability counters.
    pub fn availability(&self) -> AvailabilitySnapshot {
        self.availability.snapshot()
    }

    /// The most recent failure records, oldest first.
    pub async fn recent_failures(&self, limit: usize) -> Vec<FailureRecord> {
        self.failure_log.recent(limit).await
    }

    /// Probe the target once and fold the outcome into the counters and,
    /// on failure, the failure log.
    pub async fn check_endpoint(&self) {
        let result = self.prober.probe().await;
        self.availability.record(result.success);

        if !result.success {
            info!(
                "Probe of {} failed (status {}): {}",
                self.prober.target_url(),
                result.status_code.unwrap_or(0),
                result.detail.as_deref().unwrap_or("unknown error")
            );
            let record = FailureRecord::from_probe(
                &result,
                self.prober.target_url(),
                self.prober.expected_status(),
            );
            self.failure_log.append(record).await;
        }
    }

    /// Probe on a fixed cadence until a shutdown signal arrives, then drain
    /// the failure log.
    ///
    /// The first probe fires one full interval after start. Probes never
    /// overlap: a slow probe delays the following ticks.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Monitoring {} every {}s (expecting status {})",
            self.config.target_url, self.config.check_interval_seconds, self.config.expected_status_code
        );
        *self.state.write().await = MonitorState::Running;

        let period = self.config.check_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_endpoint().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping monitor");
                    break;
                }
            }
        }

        *self.state.write().await = MonitorState::Draining;
        self.failure_log.drain().await;
        *self.state.write().await = MonitorState::Stopped;
        info!("Monitor stopped");
    }
}
