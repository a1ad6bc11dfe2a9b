//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files;
//! environment variables and flags are layered on top by `cli.rs`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the label agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent identity and addressing mode.
    pub agent: AgentSection,

    /// Proxy admin endpoint.
    pub caddy: CaddyConfig,

    /// Container runtime and label conventions.
    pub docker: DockerConfig,

    /// Sync triggers and crash-recovery cache.
    pub sync: SyncConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// How upstream addresses are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Proxy and services share a host: dial service IPs directly.
    #[default]
    Standalone,
    /// Like standalone, on the host that runs the proxy.
    Server,
    /// Services live on another host: dial host IP plus published ports.
    Agent,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentMode::Standalone => "standalone",
            AgentMode::Server => "server",
            AgentMode::Agent => "agent",
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentSection {
    /// Owner prefix of every route this agent writes. Must not contain `_`.
    pub id: String,

    pub mode: AgentMode,

    /// Address other hosts reach this host's published ports on.
    pub host_ip: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            id: default_agent_id(),
            mode: AgentMode::default(),
            host_ip: None,
        }
    }
}

/// Host name from the environment, `/etc/hostname`, or `"agent"`.
pub fn default_agent_id() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "agent".to_string())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaddyConfig {
    /// Admin API base URL.
    pub api_url: String,

    /// Bearer token for the admin API.
    pub api_token: Option<String>,

    /// `admin.listen` written into every pushed document.
    pub admin_listen: String,

    /// Listen addresses of the server created when the document has none.
    pub listen: Vec<String>,

    /// Timeout for each admin request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CaddyConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:2019".to_string(),
            api_token: None,
            admin_listen: "0.0.0.0:2019".to_string(),
            listen: vec![":80".to_string(), ":443".to_string()],
            request_timeout_secs: 5,
        }
    }
}

impl CaddyConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Engine API unix socket.
    pub socket: PathBuf,

    /// Label key prefix (`caddy`, `caddy_1.reverse_proxy`, ...).
    pub label_prefix: String,

    /// Only services carrying this label (`key` or `key=value`) are routed.
    pub filter_label: Option<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from("/var/run/docker.sock"),
            label_prefix: "caddy".to_string(),
            filter_label: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Proxy health check interval in seconds. 0 disables.
    pub health_check_interval_secs: u64,

    /// Ceiling for health check backoff in seconds.
    pub health_backoff_max_secs: u64,

    /// Periodic full resync interval in seconds. 0 disables.
    pub resync_interval_secs: u64,

    /// Minimum seconds between event-driven syncs.
    pub debounce_secs: u64,

    /// Last assembled document, used when the proxy cannot be read.
    pub cache_path: PathBuf,

    /// How long shutdown waits for an in-flight cycle, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: 10,
            health_backoff_max_secs: 30,
            resync_interval_secs: 300,
            debounce_secs: 5,
            cache_path: PathBuf::from("caddy-output.json"),
            shutdown_grace_secs: 3,
        }
    }
}

/// `None` for a zero interval.
pub fn interval(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `text` or `json`.
    pub log_format: String,

    /// Prometheus exporter bind address.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AgentConfig = toml::from_str(
            r#"
            [agent]
            id = "edge1"
            mode = "agent"

            [sync]
            debounce_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.id, "edge1");
        assert_eq!(config.agent.mode, AgentMode::Agent);
        assert_eq!(config.sync.debounce_secs, 2);
        assert_eq!(config.sync.resync_interval_secs, 300);
        assert_eq!(config.caddy.api_url, "http://localhost:2019");
        assert_eq!(config.docker.label_prefix, "caddy");
    }

    #[test]
    fn test_zero_interval_disables() {
        assert_eq!(interval(0), None);
        assert_eq!(interval(10), Some(Duration::from_secs(10)));
    }
}
