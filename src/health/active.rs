//! Active proxy health checking.
//!
//! # Responsibilities
//! - Periodically fetch the live proxy config
//! - Back off while the admin API is unreachable
//! - Request a drift sync when own routes went missing or the API recovered

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::health::state::ProxyHealth;
use crate::observability::metrics;
use crate::sync::{SyncOrchestrator, SyncTrigger};

pub struct HealthMonitor {
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    max_backoff: Duration,
    state: ProxyHealth,
}

impl HealthMonitor {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, interval: Duration, max_backoff: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            max_backoff: max_backoff.max(interval),
            state: ProxyHealth::new(),
        }
    }

    pub fn state(&self) -> ProxyHealth {
        self.state
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_backoff_secs = self.max_backoff.as_secs(),
            "Health monitor starting"
        );

        loop {
            let delay = self.state.next_delay(self.interval, self.max_backoff);
            tokio::select! {
                _ = time::sleep(delay) => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One health check. Returns true if a drift sync was requested.
    pub async fn check(&mut self) -> bool {
        let drift = match self.orchestrator.check_drift().await {
            Ok(drift) => drift,
            Err(e) => {
                let failures = self.state.record_failure();
                metrics::record_health_failures(failures);
                tracing::warn!(failures, error = %e, "Proxy health check failed");
                return false;
            }
        };

        let recovered = self.state.record_success();
        metrics::record_health_failures(0);

        if !recovered && !drift.has_drift() {
            return false;
        }
        if drift.has_drift() {
            tracing::warn!(missing = ?drift.missing, "Own routes missing from live config");
        }
        let _ = self.orchestrator.request_sync(SyncTrigger::Drift).await;
        true
    }
}
