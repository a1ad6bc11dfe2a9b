//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build clients → Startup sync → Spawn event/periodic/health tasks
//!
//! Shutdown (shutdown.rs):
//!     Trigger → every task leaves its select loop → grace period → abort
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown has a deadline: tasks still running after the grace period are aborted
//! - No in-flight cycle is persisted on exit; the cache holds the last merged document

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run_agent, StartupError};
