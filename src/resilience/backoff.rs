//! Retry delays for the health monitor and the event stream reconnect.

use std::time::Duration;

use rand::Rng;

/// Delay before retry number `attempt`: `base` doubled per attempt after
/// the first, plus up to 10% jitter, never above `max`.
///
/// Attempt 0 means "no failure yet" and waits nothing.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let Some(doublings) = attempt.checked_sub(1) else {
        return Duration::ZERO;
    };

    let max_ms = max.as_millis().min(u64::MAX as u128) as u64;
    let base_ms = base.as_millis().min(u64::MAX as u128) as u64;
    let delay = base_ms
        .saturating_mul(2u64.saturating_pow(doublings))
        .min(max_ms);

    let spread = delay / 10;
    let jitter = match spread {
        0 => 0,
        n => rand::thread_rng().gen_range(0..n),
    };

    Duration::from_millis(delay.saturating_add(jitter).min(max_ms))
}
