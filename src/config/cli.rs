//! Command line and environment overlay.
//!
//! Precedence: flag > environment variable > TOML file > default.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError, ConfigResult};
use crate::config::schema::{AgentConfig, AgentMode};
use crate::config::validation::validate_config;

#[derive(Debug, Default, Parser)]
#[command(name = "caddy-label-agent")]
#[command(about = "Sync container labels into a shared Caddy configuration", long_about = None)]
pub struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Caddy admin API base URL.
    #[arg(long, env = "CADDY_API_URL")]
    pub caddy_api_url: Option<String>,

    /// Bearer token for the admin API.
    #[arg(long, env = "CADDY_API_TOKEN", hide_env_values = true)]
    pub caddy_api_token: Option<String>,

    /// Address other hosts reach published ports on.
    #[arg(long, env = "HOST_IP")]
    pub host_ip: Option<String>,

    #[arg(long, env = "AGENT_MODE", value_enum)]
    pub agent_mode: Option<AgentMode>,

    /// Owner prefix of generated route ids (default: host name).
    #[arg(long, env = "AGENT_ID")]
    pub agent_id: Option<String>,

    #[arg(long, env = "DOCKER_LABEL_PREFIX")]
    pub label_prefix: Option<String>,

    /// Only route services with this label (`key` or `key=value`).
    #[arg(long, env = "AGENT_FILTER_LABEL")]
    pub filter_label: Option<String>,

    /// Seconds between proxy health checks, 0 disables.
    #[arg(long, env = "HEALTH_CHECK_INTERVAL")]
    pub health_check_interval: Option<u64>,

    /// Seconds between full resyncs, 0 disables.
    #[arg(long, env = "RESYNC_INTERVAL")]
    pub resync_interval: Option<u64>,

    #[arg(long, env = "DEBOUNCE_SECONDS")]
    pub debounce_seconds: Option<u64>,

    #[arg(long, env = "CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    #[arg(long, env = "DOCKER_SOCKET")]
    pub docker_socket: Option<PathBuf>,

    /// Seconds before an admin or runtime request is abandoned.
    #[arg(long, env = "REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Prometheus exporter bind address.
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// `text` or `json`.
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// Apply every value that was given.
    pub fn apply(&self, config: &mut AgentConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.caddy.api_url, &self.caddy_api_url);
        set(&mut config.agent.mode, &self.agent_mode);
        set(&mut config.agent.id, &self.agent_id);
        set(&mut config.docker.label_prefix, &self.label_prefix);
        set(&mut config.sync.health_check_interval_secs, &self.health_check_interval);
        set(&mut config.sync.resync_interval_secs, &self.resync_interval);
        set(&mut config.sync.debounce_secs, &self.debounce_seconds);
        set(&mut config.sync.cache_path, &self.cache_path);
        set(&mut config.docker.socket, &self.docker_socket);
        set(&mut config.caddy.request_timeout_secs, &self.request_timeout);
        set(&mut config.observability.log_format, &self.log_format);

        if self.caddy_api_token.is_some() {
            config.caddy.api_token = self.caddy_api_token.clone();
        }
        if self.host_ip.is_some() {
            config.agent.host_ip = self.host_ip.clone();
        }
        if self.filter_label.is_some() {
            config.docker.filter_label = self.filter_label.clone();
        }
        if self.metrics_address.is_some() {
            config.observability.metrics_address = self.metrics_address.clone();
        }
    }

    /// File (if any) overlaid with flags and environment, then validated.
    pub fn load(&self) -> ConfigResult<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => AgentConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "caddy-label-agent",
            "--agent-id",
            "edge1",
            "--agent-mode",
            "agent",
            "--host-ip",
            "203.0.113.9",
            "--resync-interval",
            "0",
        ])
        .unwrap();

        let config = cli.load().unwrap();
        assert_eq!(config.agent.id, "edge1");
        assert_eq!(config.agent.mode, AgentMode::Agent);
        assert_eq!(config.agent.host_ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(config.sync.resync_interval_secs, 0);
        assert_eq!(config.sync.debounce_secs, 5);
    }

    #[test]
    fn test_invalid_overlay_rejected() {
        let cli = Cli {
            agent_id: Some("bad_id".into()),
            ..Cli::default()
        };
        assert!(matches!(cli.load(), Err(ConfigError::Validation(_))));
    }
}
