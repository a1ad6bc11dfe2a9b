//! Proxy health monitoring.
//!
//! # Data Flow
//! ```text
//! ticker (base interval, backoff while failing)
//!     → active.rs (fetch live config, compare with last push)
//!     → state.rs (failure streak, recovery detection)
//!     → SyncTrigger::Drift on recovery or missing routes
//! ```

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::ProxyHealth;
