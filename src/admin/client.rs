//! HTTP client for the Caddy admin API.
//!
//! ```text
//! GET  <base>/config/   → current document (`null` when empty)
//! POST <base>/load      → replace the whole document
//! ```

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::admin::auth::auth_headers;
use crate::admin::{AdminError, AdminResult, ProxyAdmin};
use crate::document::ConfigDocument;

pub struct CaddyAdminClient {
    client: reqwest::Client,
    config_url: Url,
    load_url: Url,
}

impl CaddyAdminClient {
    pub fn new(base: &Url, token: Option<&str>, timeout: Duration) -> AdminResult<Self> {
        let client = reqwest::Client::builder()
            .default_headers(auth_headers(token)?)
            .timeout(timeout)
            .build()
            .map_err(|e| AdminError::Request(e.to_string()))?;

        Ok(Self {
            client,
            config_url: join(base, "config/")?,
            load_url: join(base, "load")?,
        })
    }

    pub fn config_url(&self) -> &Url {
        &self.config_url
    }
}

fn join(base: &Url, path: &str) -> AdminResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(path).map_err(|e| AdminError::Url(e.to_string()))
}

fn request_error(e: reqwest::Error) -> AdminError {
    if e.is_timeout() {
        AdminError::Timeout
    } else {
        AdminError::Request(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> AdminResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AdminError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ProxyAdmin for CaddyAdminClient {
    async fn fetch_config(&self) -> AdminResult<ConfigDocument> {
        let response = self
            .client
            .get(self.config_url.clone())
            .send()
            .await
            .map_err(request_error)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(request_error)?;

        let doc: Option<ConfigDocument> = serde_json::from_slice(&bytes)?;
        Ok(doc.unwrap_or_default())
    }

    async fn load_config(&self, doc: &ConfigDocument) -> AdminResult<()> {
        let response = self
            .client
            .post(self.load_url.clone())
            .json(doc)
            .send()
            .await
            .map_err(request_error)?;
        check_status(response).await?;
        Ok(())
    }
}
