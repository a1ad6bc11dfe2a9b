//! Proxy admin endpoint.
//!
//! # Responsibilities
//! - Fetch the live configuration document
//! - Replace it wholesale
//!
//! # Design Decisions
//! - Reached only through the `ProxyAdmin` trait
//! - Every request carries a timeout
//! - No partial patches: the whole document is loaded each time

pub mod auth;
pub mod client;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::ConfigDocument;

pub use client::CaddyAdminClient;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin request failed: {0}")]
    Request(String),

    #[error("admin API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("admin response is not a valid config: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("admin request timed out")]
    Timeout,

    #[error("admin token contains characters not allowed in a header")]
    InvalidToken,

    #[error("invalid admin URL: {0}")]
    Url(String),
}

pub type AdminResult<T> = Result<T, AdminError>;

/// The proxy's configuration API.
#[async_trait]
pub trait ProxyAdmin: Send + Sync {
    /// Current document. An unconfigured proxy yields the default document.
    async fn fetch_config(&self) -> AdminResult<ConfigDocument>;

    /// Replace the whole document.
    async fn load_config(&self, doc: &ConfigDocument) -> AdminResult<()>;
}
