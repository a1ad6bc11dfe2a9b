//! Global settings and TLS automation policies.
//!
//! # Data Flow
//! ```text
//! global bundles (all services) → settings.rs → GlobalSettings (last wins)
//! HTTPS routes with tls.dns     → aggregator.rs → PolicySet
//! PolicySet + document policies → merge_policies → scoped..., catch-all
//! ```

pub mod aggregator;
pub mod settings;

pub use aggregator::{effective_email, merge_policies, order_policies, propagate_email, PolicySet};
pub use settings::{AutoHttpsMode, GlobalSettings};
