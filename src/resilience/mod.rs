//! Resilience helpers.
//!
//! - backoff.rs: exponential delay for health checks and event
//!   stream reconnects

pub mod backoff;

pub use backoff::calculate_backoff;
