//! Proxy health state.
//!
//! # State Transitions
//! ```text
//! Healthy → Failing:  any failed check (streak starts at 1)
//! Failing → Failing:  streak grows, check delay doubles up to the cap
//! Failing → Healthy:  first successful check (recovery)
//! ```
//!
//! # Design Decisions
//! - Recovery is reported once so the caller can force a resync
//! - Delay resets to the base interval on success

use std::time::Duration;

use crate::resilience::calculate_backoff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyHealth {
    consecutive_failures: u32,
}

impl ProxyHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }

    /// Record a failed check. Returns the new streak length.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Record a successful check. True if this ends a failure streak.
    pub fn record_success(&mut self) -> bool {
        let recovered = self.consecutive_failures > 0;
        if recovered {
            tracing::info!(failures = self.consecutive_failures, "Proxy admin API recovered");
        }
        self.consecutive_failures = 0;
        recovered
    }

    /// Delay before the next check.
    pub fn next_delay(&self, base: Duration, max: Duration) -> Duration {
        if self.consecutive_failures == 0 {
            return base;
        }
        calculate_backoff(self.consecutive_failures.saturating_add(1), base, max).max(base)
    }
}
