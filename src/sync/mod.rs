//! Sync orchestration.
//!
//! # Data Flow
//! ```text
//! Startup ───────┐
//! Events ────────┤                          ┌→ fetch / cache / skeleton
//! Periodic ──────┼→ SyncOrchestrator ──────┼→ merge → persist → push
//! Health drift ──┘   (debounce + gate)      └→ last pushed ids
//! ```

pub mod orchestrator;
pub mod triggers;

pub use orchestrator::{
    CycleOutcome, CycleReport, DocumentSource, DriftReport, OrchestratorSettings, SyncError,
    SyncOrchestrator, SyncResult, SyncTrigger,
};
pub use triggers::{run_event_loop, run_periodic_loop};
