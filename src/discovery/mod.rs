//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Container runtime
//!     → docker.rs (list containers, stream lifecycle events)
//!     → ServiceRecord (labels + network attributes)
//!     → filter.rs (optional label predicate)
//!     → pipeline (label parsing, route synthesis)
//! ```
//!
//! # Design Decisions
//! - The runtime is reached only through the `DiscoverySource` trait
//! - Every snapshot call is bounded by a timeout
//! - Only start/stop/die/destroy events are forwarded

pub mod docker;
pub mod filter;
pub mod host;
pub mod static_source;
pub mod types;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use docker::DockerSource;
pub use filter::ServiceFilter;
pub use static_source::StaticSource;
pub use types::{
    DiscoveryError, DiscoveryResult, LifecycleAction, LifecycleEvent, NetworkAttachment,
    PortMapping, ServiceRecord,
};

/// Source of running services and their lifecycle changes.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Current set of running services.
    async fn snapshot(&self) -> DiscoveryResult<Vec<ServiceRecord>>;

    /// Stream of lifecycle events. The stream ends when the source
    /// disconnects; callers resubscribe.
    async fn subscribe(&self) -> DiscoveryResult<mpsc::Receiver<LifecycleEvent>>;
}
