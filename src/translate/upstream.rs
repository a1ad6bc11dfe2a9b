//! Upstream address resolution.
//!
//! # Responsibilities
//! - Expand `{{upstreams <port>}}` into a dial address for the service
//! - Pass static addresses through unchanged
//!
//! # Addressing Modes
//! ```text
//! no remote host:  host network → localhost:<port>
//!                  otherwise    → <service ip>:<port>
//! remote host H:   host network → H:<port>
//!                  otherwise    → H:<published port>   (must be published)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::discovery::ServiceRecord;

static UPSTREAM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*upstreams\s+(\S+?)\s*\}\}|\S+").expect("upstream token pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("service {service} publishes no host port for container port {port}")]
    NoPublishedPort { service: String, port: u16 },

    #[error("service {service} has no network address")]
    NoNetworkAddress { service: String },

    #[error("invalid upstream port '{0}'")]
    InvalidPort(String),

    #[error("no upstream address given")]
    Empty,
}

/// Resolves upstream values for one service.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamResolver<'a> {
    service: &'a ServiceRecord,
    remote_host: Option<&'a str>,
}

impl<'a> UpstreamResolver<'a> {
    /// `remote_host` is the effective host address when upstreams must be
    /// reached from another machine; `None` for same-host addressing.
    pub fn new(service: &'a ServiceRecord, remote_host: Option<&'a str>) -> Self {
        Self {
            service,
            remote_host,
        }
    }

    /// Resolve every whitespace-separated upstream in `value`.
    ///
    /// Upstreams that fail to resolve are dropped with a warning. Fails only
    /// when nothing resolved.
    pub fn resolve_all(&self, value: &str) -> Result<Vec<String>, ResolveError> {
        let mut resolved = Vec::new();
        let mut first_error = None;

        for token in UPSTREAM_TOKEN.captures_iter(value) {
            let result = match token.get(1) {
                Some(port) => self.resolve_template(port.as_str()),
                None => Ok(token[0].to_string()),
            };
            match result {
                Ok(dial) => resolved.push(dial),
                Err(e) => {
                    tracing::warn!(
                        service = %self.service.name,
                        upstream = %&token[0],
                        error = %e,
                        "Cannot resolve upstream"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if resolved.is_empty() {
            return Err(first_error.unwrap_or(ResolveError::Empty));
        }
        Ok(resolved)
    }

    fn resolve_template(&self, port: &str) -> Result<String, ResolveError> {
        let port: u16 = port
            .parse()
            .map_err(|_| ResolveError::InvalidPort(port.to_string()))?;
        self.resolve_port(port)
    }

    /// Dial address for a container port.
    pub fn resolve_port(&self, port: u16) -> Result<String, ResolveError> {
        let service = self.service;
        let dial = match (self.remote_host, service.host_network) {
            (None, true) => join_host_port("localhost", port),
            (None, false) => {
                let ip = service
                    .primary_ip()
                    .ok_or_else(|| ResolveError::NoNetworkAddress {
                        service: service.name.clone(),
                    })?;
                join_host_port(ip, port)
            }
            (Some(host), true) => join_host_port(host, port),
            (Some(host), false) => {
                let published =
                    service
                        .published_port(port)
                        .ok_or_else(|| ResolveError::NoPublishedPort {
                            service: service.name.clone(),
                            port,
                        })?;
                join_host_port(host, published)
            }
        };

        tracing::debug!(service = %service.name, port, dial = %dial, "Resolved upstream template");
        Ok(dial)
    }
}

/// `host:port`, bracketing IPv6 literals.
fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
