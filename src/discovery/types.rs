//! Discovered services and lifecycle notifications.

use std::collections::BTreeMap;

use thiserror::Error;

/// One running service (container) as seen by the discovery source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Service name, used in route identifiers.
    pub name: String,
    /// Runtime identifier (container id).
    pub id: String,
    pub labels: BTreeMap<String, String>,
    /// Network attachments in discovery order.
    pub networks: Vec<NetworkAttachment>,
    pub ports: Vec<PortMapping>,
    /// Shares the host's network namespace.
    pub host_network: bool,
}

impl ServiceRecord {
    /// Address on the first attached network that has one.
    pub fn primary_ip(&self) -> Option<&str> {
        self.networks
            .iter()
            .map(|n| n.ip_address.as_str())
            .find(|ip| !ip.is_empty())
    }

    /// Host port published for `private_port/tcp`.
    pub fn published_port(&self, private_port: u16) -> Option<u16> {
        self.ports
            .iter()
            .filter(|p| p.private_port == private_port && p.protocol == "tcp")
            .find_map(|p| p.public_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAttachment {
    pub name: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    pub protocol: String,
}

/// Lifecycle transitions that invalidate the current route set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Die,
    Destroy,
}

impl LifecycleAction {
    /// Parse a runtime action name; other actions are not relevant.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "die" => Some(Self::Die),
            "destroy" => Some(Self::Destroy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub action: LifecycleAction,
    pub service: String,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot connect to discovery source: {0}")]
    Connect(String),

    #[error("discovery request failed: {0}")]
    Request(String),

    #[error("discovery source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot decode discovery response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("discovery request timed out after {0} seconds")]
    Timeout(u64),
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ServiceRecord {
        ServiceRecord {
            name: "web".into(),
            networks: vec![
                NetworkAttachment {
                    name: "none".into(),
                    ip_address: String::new(),
                },
                NetworkAttachment {
                    name: "frontend".into(),
                    ip_address: "172.18.0.5".into(),
                },
            ],
            ports: vec![
                PortMapping {
                    private_port: 8080,
                    public_port: None,
                    protocol: "tcp".into(),
                },
                PortMapping {
                    private_port: 8080,
                    public_port: Some(40001),
                    protocol: "udp".into(),
                },
                PortMapping {
                    private_port: 8080,
                    public_port: Some(40002),
                    protocol: "tcp".into(),
                },
            ],
            ..ServiceRecord::default()
        }
    }

    #[test]
    fn test_primary_ip_skips_empty() {
        assert_eq!(service().primary_ip(), Some("172.18.0.5"));
    }

    #[test]
    fn test_published_port_is_tcp_only() {
        assert_eq!(service().published_port(8080), Some(40002));
        assert_eq!(service().published_port(9000), None);
    }

    #[test]
    fn test_lifecycle_action_parse() {
        assert_eq!(LifecycleAction::parse("die"), Some(LifecycleAction::Die));
        assert_eq!(LifecycleAction::parse("exec_start"), None);
    }
}
