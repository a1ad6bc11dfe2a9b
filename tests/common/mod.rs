//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use url::Url;

use caddy_label_agent::discovery::{NetworkAttachment, PortMapping, ServiceRecord};
use caddy_label_agent::document::ConfigDocument;

/// State behind the mock admin API.
#[derive(Default)]
pub struct MockCaddyState {
    config: Mutex<Value>,
    loads: Mutex<Vec<Value>>,
    auth: Mutex<Vec<Option<String>>>,
    fail_fetch: AtomicBool,
    fail_load: AtomicBool,
}

/// Handle to a running mock of the Caddy admin API.
///
/// `GET /config/` serves the stored document (`null` until something is
/// loaded); `POST /load` records the body and makes it the live config.
#[derive(Clone)]
pub struct MockCaddy {
    pub addr: SocketAddr,
    state: Arc<MockCaddyState>,
}

impl MockCaddy {
    pub async fn start() -> Self {
        let state = Arc::new(MockCaddyState {
            config: Mutex::new(Value::Null),
            ..MockCaddyState::default()
        });

        let app = Router::new()
            .route("/config/", get(get_config))
            .route("/load", post(load_config))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    /// Replace the live config, as another agent or an operator would.
    pub fn set_config(&self, config: Value) {
        *self.state.config.lock().unwrap() = config;
    }

    pub fn config(&self) -> Value {
        self.state.config.lock().unwrap().clone()
    }

    pub fn document(&self) -> ConfigDocument {
        serde_json::from_value(self.config()).unwrap()
    }

    pub fn loads(&self) -> Vec<Value> {
        self.state.loads.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.auth.lock().unwrap().clone()
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.state.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_load(&self, fail: bool) {
        self.state.fail_load.store(fail, Ordering::SeqCst);
    }
}

async fn get_config(
    State(state): State<Arc<MockCaddyState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    record_auth(&state, &headers);
    if state.fail_fetch.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(state.config.lock().unwrap().clone()))
}

async fn load_config(
    State(state): State<Arc<MockCaddyState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    record_auth(&state, &headers);
    if state.fail_load.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.loads.lock().unwrap().push(body.clone());
    *state.config.lock().unwrap() = body;
    StatusCode::OK
}

fn record_auth(state: &MockCaddyState, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.auth.lock().unwrap().push(value);
}

/// A bridged container with one network address.
pub fn service(name: &str, ip: &str, labels: &[(&str, &str)]) -> ServiceRecord {
    ServiceRecord {
        name: name.to_string(),
        id: format!("{name}-id"),
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        networks: vec![NetworkAttachment {
            name: "bridge".to_string(),
            ip_address: ip.to_string(),
        }],
        ports: Vec::new(),
        host_network: false,
    }
}

/// Publish `private` as `public` on the host.
pub fn publish(mut record: ServiceRecord, private: u16, public: u16) -> ServiceRecord {
    record.ports.push(PortMapping {
        private_port: private,
        public_port: Some(public),
        protocol: "tcp".to_string(),
    });
    record
}

/// Route ids of every server, in server then route order.
pub fn route_ids(doc: &ConfigDocument) -> Vec<String> {
    doc.routes().filter_map(|r| r.id.clone()).collect()
}

/// Route ids of one server.
pub fn server_route_ids(doc: &ConfigDocument, server: &str) -> Vec<String> {
    doc.apps.http.servers[server]
        .routes
        .iter()
        .filter_map(|r| r.id.clone())
        .collect()
}
