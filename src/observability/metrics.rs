//! Agent metrics.
//!
//! # Metrics
//! - `agent_sync_cycles_total` (counter): sync cycles by outcome
//! - `agent_push_failures_total` (counter): failed config loads
//! - `agent_routes_owned` (gauge): routes this agent last pushed
//! - `agent_health_failures_consecutive` (gauge): current failure streak
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is optional and bound only when configured

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const SYNC_CYCLES: &str = "agent_sync_cycles_total";
pub const PUSH_FAILURES: &str = "agent_push_failures_total";
pub const ROUTES_OWNED: &str = "agent_routes_owned";
pub const HEALTH_FAILURES: &str = "agent_health_failures_consecutive";

/// Install the Prometheus exporter on `addr` and describe all metrics.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            register_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

pub fn register_metrics() {
    describe_counter!(SYNC_CYCLES, "Sync cycles by outcome");
    describe_counter!(PUSH_FAILURES, "Failed config pushes to the proxy");
    describe_gauge!(ROUTES_OWNED, "Routes owned by this agent after the last push");
    describe_gauge!(HEALTH_FAILURES, "Consecutive failed proxy health checks");
}

pub fn record_sync_cycle(outcome: &'static str) {
    counter!(SYNC_CYCLES, "outcome" => outcome).increment(1);
}

pub fn record_push_failure() {
    counter!(PUSH_FAILURES).increment(1);
}

pub fn record_routes_owned(count: usize) {
    gauge!(ROUTES_OWNED).set(count as f64);
}

pub fn record_health_failures(consecutive: u32) {
    gauge!(HEALTH_FAILURES).set(f64::from(consecutive));
}
