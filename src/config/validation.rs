//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check identities, URLs, addresses and the service filter
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use url::Url;

use crate::config::schema::AgentConfig;
use crate::discovery::ServiceFilter;
use crate::document::schema::ID_DELIMITER;
use crate::observability::LogFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("agent id must not be empty")]
    EmptyAgentId,

    #[error("agent id '{0}' must not contain '{delim}'", delim = ID_DELIMITER)]
    AgentIdDelimiter(String),

    #[error("invalid caddy api url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid host ip '{0}'")]
    InvalidHostIp(String),

    #[error("label prefix must not be empty")]
    EmptyLabelPrefix,

    #[error("invalid filter label: {0}")]
    InvalidFilter(String),

    #[error("debounce interval must be greater than zero")]
    ZeroDebounce,

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),
}

pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let id = config.agent.id.trim();
    if id.is_empty() {
        errors.push(ValidationError::EmptyAgentId);
    } else if id.contains(ID_DELIMITER) {
        errors.push(ValidationError::AgentIdDelimiter(id.to_string()));
    }

    match Url::parse(&config.caddy.api_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            url: config.caddy.api_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            url: config.caddy.api_url.clone(),
            reason: e.to_string(),
        }),
    }

    if let Some(ip) = &config.agent.host_ip {
        if ip.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidHostIp(ip.clone()));
        }
    }

    if config.docker.label_prefix.trim().is_empty() {
        errors.push(ValidationError::EmptyLabelPrefix);
    }

    if let Some(filter) = &config.docker.filter_label {
        if let Err(e) = filter.parse::<ServiceFilter>() {
            errors.push(ValidationError::InvalidFilter(e));
        }
    }

    if config.sync.debounce_secs == 0 {
        errors.push(ValidationError::ZeroDebounce);
    }

    if config.caddy.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if let Err(e) = config.observability.log_format.parse::<LogFormat>() {
        errors.push(ValidationError::InvalidLogFormat(e));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.agent.id = "edge1".into();
        config
    }

    #[test]
    fn test_defaults_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.agent.id = "edge_1".into();
        config.caddy.api_url = "not a url".into();
        config.sync.debounce_secs = 0;
        config.docker.filter_label = Some("=x".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[0], ValidationError::AgentIdDelimiter("edge_1".into()));
        assert!(matches!(errors[1], ValidationError::InvalidUrl { .. }));
        assert!(errors.contains(&ValidationError::ZeroDebounce));
    }

    #[test]
    fn test_host_ip_and_metrics_address() {
        let mut config = valid();
        config.agent.host_ip = Some("203.0.113.9".into());
        config.observability.metrics_address = Some("0.0.0.0:9100".into());
        assert!(validate_config(&config).is_ok());

        config.agent.host_ip = Some("host.local".into());
        config.observability.metrics_address = Some("9100".into());
        assert_eq!(validate_config(&config).unwrap_err().len(), 2);
    }
}
