//! Reconciliation of the shared proxy document.
//!
//! # Data Flow
//! ```text
//! fetched document (or cache, or skeleton)
//!     + DesiredState (routes, policies, settings)
//!     → merge.rs (ownership-partitioned merge)
//!     → updated document + MergeReport
//! ```

pub mod desired;
pub mod merge;

pub use desired::DesiredState;
pub use merge::{detect_layout, ListenerLayout, MergeReport, Reconciler};
