//! Caddy label agent.
//!
//! Watches containers, turns their `caddy.*` labels into routes, and keeps
//! a shared Caddy configuration in sync without touching routes owned by
//! other agents.
//!
//! # Architecture Overview
//!
//! ```text
//!   Docker events ─┐
//!   periodic tick ─┼──▶ sync ──▶ discovery ──▶ labels ──▶ translate/routing
//!   health drift ──┘     │                                     │
//!                        │                                     ▼
//!                        │                               policy (TLS, globals)
//!                        ▼                                     │
//!                  admin (GET /config/) ──▶ reconcile ◀────────┘
//!                        │                     │
//!                        ▼                     ▼
//!                  document cache        admin (POST /load)
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```

// Input
pub mod config;
pub mod discovery;
pub mod labels;

// Synthesis
pub mod pipeline;
pub mod policy;
pub mod routing;
pub mod translate;

// Output
pub mod admin;
pub mod document;
pub mod reconcile;

// Runtime
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod sync;

pub use config::schema::AgentConfig;
pub use lifecycle::{run_agent, Shutdown};
pub use pipeline::{synthesize, SynthesisOptions};
pub use reconcile::{DesiredState, Reconciler};
pub use sync::{SyncOrchestrator, SyncTrigger};
