//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the discovery source and admin client from configuration
//! - Run the startup sync before any background task starts
//! - Spawn the event, periodic and health tasks plus the signal handler
//! - On shutdown, give tasks a grace period, then abort the rest
//!
//! # Design Decisions
//! - A failed startup sync is logged, not fatal: the health monitor and
//!   periodic resync retry once the proxy is reachable
//! - Only invalid configuration (bad admin URL) fails startup

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

use crate::admin::{AdminError, CaddyAdminClient, ProxyAdmin};
use crate::config::schema::interval;
use crate::config::AgentConfig;
use crate::discovery::{DiscoverySource, DockerSource};
use crate::health::HealthMonitor;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::lifecycle::Shutdown;
use crate::sync::{run_event_loop, run_periodic_loop, OrchestratorSettings, SyncOrchestrator, SyncTrigger};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid admin url {url}: {reason}")]
    AdminUrl { url: String, reason: String },

    #[error("admin client: {0}")]
    Admin(#[from] AdminError),
}

/// Run the agent until a termination signal arrives.
pub async fn run_agent(config: AgentConfig) -> Result<(), StartupError> {
    let api_url = Url::parse(&config.caddy.api_url).map_err(|e| StartupError::AdminUrl {
        url: config.caddy.api_url.clone(),
        reason: e.to_string(),
    })?;
    let admin = CaddyAdminClient::new(
        &api_url,
        config.caddy.api_token.as_deref(),
        config.caddy.request_timeout(),
    )?;
    let discovery = DockerSource::new(config.docker.socket.clone(), config.caddy.request_timeout());

    tracing::info!(
        agent_id = %config.agent.id,
        mode = %config.agent.mode,
        admin = %admin.config_url(),
        docker = %discovery.socket().display(),
        "Agent starting"
    );

    let shutdown = Shutdown::new();
    let mut shutdown_rx = shutdown.subscribe();
    let signals = spawn_signal_handler(shutdown.clone());
    let tasks = start(&config, Arc::new(discovery), Arc::new(admin), &shutdown).await;

    if !shutdown.is_triggered() {
        let _ = shutdown_rx.recv().await;
    }
    signals.abort();

    drain(tasks, Duration::from_secs(config.sync.shutdown_grace_secs)).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run the startup cycle and spawn every background task.
///
/// Split from `run_agent` so the same wiring runs against any discovery
/// source and admin backend.
pub async fn start(
    config: &AgentConfig,
    discovery: Arc<dyn DiscoverySource>,
    admin: Arc<dyn ProxyAdmin>,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    let orchestrator = Arc::new(SyncOrchestrator::new(
        OrchestratorSettings::from_config(config),
        discovery,
        admin,
    ));

    if let Err(e) = orchestrator.request_sync(SyncTrigger::Startup).await {
        tracing::warn!(error = %e, "Startup sync failed, waiting for next trigger");
    }

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(run_event_loop(
        Arc::clone(&orchestrator),
        shutdown.subscribe(),
    )));

    match interval(config.sync.resync_interval_secs) {
        Some(period) => tasks.push(tokio::spawn(run_periodic_loop(
            Arc::clone(&orchestrator),
            period,
            shutdown.subscribe(),
        ))),
        None => tracing::info!("Periodic resync disabled"),
    }

    match interval(config.sync.health_check_interval_secs) {
        Some(period) => {
            let monitor = HealthMonitor::new(
                Arc::clone(&orchestrator),
                period,
                Duration::from_secs(config.sync.health_backoff_max_secs),
            );
            tasks.push(tokio::spawn(monitor.run(shutdown.subscribe())));
        }
        None => tracing::info!("Health monitor disabled"),
    }

    tasks
}

/// Wait up to `grace` for tasks to finish, then abort stragglers.
pub async fn drain(tasks: Vec<JoinHandle<()>>, grace: Duration) {
    let aborts: Vec<_> = tasks.iter().map(|t| t.abort_handle()).collect();
    let joined = join_tasks(tasks);

    if tokio::time::timeout(grace, joined).await.is_err() {
        tracing::warn!(grace_secs = grace.as_secs(), "Tasks still running after grace period, aborting");
        for handle in aborts {
            handle.abort();
        }
    }
}

async fn join_tasks(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_aborts_stuck_tasks() {
        let stuck = tokio::spawn(std::future::pending::<()>());
        let done = tokio::spawn(async {});
        let start = tokio::time::Instant::now();

        drain(vec![done, stuck], Duration::from_millis(50)).await;
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
