//! Route construction and ordering.
//!
//! # Data Flow
//! ```text
//! (service, route index, resolved bundle)
//!     → assembler.rs (domains, handler chain, identifiers)
//!     → AssembledRoute[]
//!
//! server route list (after merge)
//!     → matcher.rs (stable sort: exact hosts, then wildcards)
//! ```
//!
//! # Design Decisions
//! - Identifiers are derived, never random: re-syncs replace in place
//! - An unassemblable bundle is skipped, never fatal to its siblings
//! - Deterministic: same input always yields the same routes in the same order

pub mod assembler;
pub mod matcher;

pub use assembler::{
    split_domains, AssembleError, AssembledRoute, DomainSet, RouteAssembler, RouteProtocol,
};
pub use matcher::{is_wildcard_host, is_wildcard_route, order_by_specificity};
