//! Docker Engine discovery over the local unix socket.
//!
//! # Responsibilities
//! - List running containers with labels, networks and published ports
//! - Stream container lifecycle events
//!
//! Each request opens its own HTTP/1.1 connection; the event stream keeps
//! its connection for as long as the engine sends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::{Bytes, Incoming};
use hyper::client::conn::http1;
use hyper::{header, Request, Response};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::discovery::types::{
    DiscoveryError, DiscoveryResult, LifecycleAction, LifecycleEvent, NetworkAttachment,
    PortMapping, ServiceRecord,
};
use crate::discovery::DiscoverySource;

const CONTAINERS_PATH: &str = "/containers/json";
// filters={"type":["container"]}
const EVENTS_PATH: &str = "/events?filters=%7B%22type%22%3A%5B%22container%22%5D%7D";
const EVENT_BUFFER: usize = 64;

/// Discovery source backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerSource {
    socket: PathBuf,
    timeout: Duration,
}

impl DockerSource {
    pub fn new(socket: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            timeout,
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    async fn send(&self, path: &str) -> DiscoveryResult<Response<Incoming>> {
        let stream = UnixStream::connect(&self.socket).await.map_err(|e| {
            DiscoveryError::Connect(format!("{}: {}", self.socket.display(), e))
        })?;
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| DiscoveryError::Connect(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Docker connection closed with error");
            }
        });

        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header(header::HOST, "docker")
            .body(Empty::<Bytes>::new())
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = read_body(response.into_body())
                .await
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            return Err(DiscoveryError::Status { status, body });
        }
        Ok(response)
    }

    fn timeout_error(&self) -> DiscoveryError {
        DiscoveryError::Timeout(self.timeout.as_secs())
    }
}

#[async_trait]
impl DiscoverySource for DockerSource {
    async fn snapshot(&self) -> DiscoveryResult<Vec<ServiceRecord>> {
        let fetch = async {
            let response = self.send(CONTAINERS_PATH).await?;
            read_body(response.into_body()).await
        };
        let body = timeout(self.timeout, fetch)
            .await
            .map_err(|_| self.timeout_error())??;

        let containers: Vec<ContainerSummary> = serde_json::from_slice(&body)?;
        let services: Vec<ServiceRecord> = containers.into_iter().map(ServiceRecord::from).collect();
        tracing::debug!(count = services.len(), "Listed running containers");
        Ok(services)
    }

    async fn subscribe(&self) -> DiscoveryResult<mpsc::Receiver<LifecycleEvent>> {
        let response = timeout(self.timeout, self.send(EVENTS_PATH))
            .await
            .map_err(|_| self.timeout_error())??;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(response.into_body(), tx));
        tracing::info!(socket = %self.socket.display(), "Subscribed to Docker events");
        Ok(rx)
    }
}

async fn read_body(body: Incoming) -> DiscoveryResult<Bytes> {
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| DiscoveryError::Request(e.to_string()))
}

/// Forward newline-delimited engine events until the stream or the
/// receiver goes away.
async fn pump_events(mut body: Incoming, tx: mpsc::Sender<LifecycleEvent>) {
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Docker event stream failed");
                break;
            }
        };
        let Ok(data) = frame.into_data() else {
            continue;
        };
        buffer.extend_from_slice(&data);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if let Some(event) = decode_event(&line) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    }

    tracing::warn!("Docker event stream ended");
}

fn decode_event(line: &[u8]) -> Option<LifecycleEvent> {
    let line = std::str::from_utf8(line).ok()?.trim();
    if line.is_empty() {
        return None;
    }
    let event: EngineEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping undecodable Docker event");
            return None;
        }
    };
    if event.kind != "container" {
        return None;
    }
    let action = LifecycleAction::parse(&event.action)?;
    let service = event
        .actor
        .and_then(|actor| actor.attributes.get("name").cloned())
        .unwrap_or_default();
    Some(LifecycleEvent { action, service })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerSummary {
    id: String,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    ports: Option<Vec<EnginePort>>,
    #[serde(default)]
    host_config: Option<HostConfigSummary>,
    #[serde(default)]
    network_settings: Option<NetworkSettingsSummary>,
}

#[derive(Debug, Deserialize)]
struct EnginePort {
    #[serde(rename = "PrivatePort")]
    private_port: u16,
    #[serde(rename = "PublicPort", default)]
    public_port: Option<u16>,
    #[serde(rename = "Type", default)]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostConfigSummary {
    #[serde(default)]
    network_mode: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkSettingsSummary {
    #[serde(default)]
    networks: BTreeMap<String, EndpointSummary>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointSummary {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct EngineEvent {
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "Action", default)]
    action: String,
    #[serde(rename = "Actor", default)]
    actor: Option<EngineActor>,
}

#[derive(Debug, Deserialize)]
struct EngineActor {
    #[serde(rename = "Attributes", default)]
    attributes: BTreeMap<String, String>,
}

impl From<ContainerSummary> for ServiceRecord {
    fn from(c: ContainerSummary) -> Self {
        let name = c
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| c.id.chars().take(12).collect());

        let host_network = c
            .host_config
            .as_ref()
            .is_some_and(|hc| hc.network_mode == "host");

        let mut networks: Vec<NetworkAttachment> = c
            .network_settings
            .map(|ns| {
                ns.networks
                    .into_iter()
                    .map(|(name, endpoint)| NetworkAttachment {
                        name,
                        ip_address: endpoint.ip_address,
                    })
                    .collect()
            })
            .unwrap_or_default();
        // The engine reports networks as an unordered map; the network named
        // by NetworkMode is the primary one, the rest follow by name.
        if let Some(mode) = c.host_config.as_ref().map(|hc| hc.network_mode.as_str()) {
            if let Some(pos) = networks.iter().position(|n| n.name == mode) {
                networks[..=pos].rotate_right(1);
            }
        }

        let ports = c
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|p| PortMapping {
                private_port: p.private_port,
                public_port: p.public_port,
                protocol: p.kind,
            })
            .collect();

        ServiceRecord {
            name,
            id: c.id,
            labels: c.labels.unwrap_or_default(),
            networks,
            ports,
            host_network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_summary_conversion() {
        let raw = r#"[{
            "Id": "3f4e5d6c7b8a9f0e1d2c",
            "Names": ["/whoami"],
            "Labels": {"caddy": "whoami.lan", "caddy.reverse_proxy": "{{upstreams 80}}"},
            "Ports": [
                {"IP": "0.0.0.0", "PrivatePort": 80, "PublicPort": 40001, "Type": "tcp"},
                {"PrivatePort": 443, "Type": "tcp"}
            ],
            "HostConfig": {"NetworkMode": "bridge"},
            "NetworkSettings": {"Networks": {"bridge": {"IPAddress": "172.17.0.3"}}}
        }]"#;

        let containers: Vec<ContainerSummary> = serde_json::from_str(raw).unwrap();
        let service = ServiceRecord::from(containers.into_iter().next().unwrap());

        assert_eq!(service.name, "whoami");
        assert_eq!(service.labels.len(), 2);
        assert!(!service.host_network);
        assert_eq!(service.primary_ip(), Some("172.17.0.3"));
        assert_eq!(service.published_port(80), Some(40001));
        assert_eq!(service.published_port(443), None);
    }

    #[test]
    fn test_network_mode_names_primary_network() {
        let raw = r#"[{
            "Id": "0123456789abcdef", "Names": ["/api"],
            "HostConfig": {"NetworkMode": "proxy"},
            "NetworkSettings": {"Networks": {
                "backend": {"IPAddress": "10.1.0.4"},
                "proxy": {"IPAddress": "172.20.0.7"}
            }}
        }]"#;
        let containers: Vec<ContainerSummary> = serde_json::from_str(raw).unwrap();
        let service = ServiceRecord::from(containers.into_iter().next().unwrap());

        assert_eq!(service.primary_ip(), Some("172.20.0.7"));
        assert_eq!(service.networks[1].name, "backend");
    }

    #[test]
    fn test_null_labels_and_host_network() {
        let raw = r#"[{"Id": "abcdef0123456789", "Names": [], "Labels": null,
                       "Ports": null, "HostConfig": {"NetworkMode": "host"}}]"#;
        let containers: Vec<ContainerSummary> = serde_json::from_str(raw).unwrap();
        let service = ServiceRecord::from(containers.into_iter().next().unwrap());

        assert_eq!(service.name, "abcdef012345");
        assert!(service.labels.is_empty());
        assert!(service.host_network);
    }

    #[test]
    fn test_decode_event() {
        let line = br#"{"Type":"container","Action":"die","Actor":{"ID":"x","Attributes":{"name":"web"}}}
"#;
        assert_eq!(
            decode_event(line),
            Some(LifecycleEvent {
                action: LifecycleAction::Die,
                service: "web".into()
            })
        );

        let exec = br#"{"Type":"container","Action":"exec_start: sh","Actor":{"Attributes":{}}}"#;
        assert_eq!(decode_event(exec), None);

        let network = br#"{"Type":"network","Action":"connect"}"#;
        assert_eq!(decode_event(network), None);
    }
}
