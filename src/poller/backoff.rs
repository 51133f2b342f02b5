//! Poll Scheduling
//!
//! Capped exponential backoff and jitter for the wait between polls.

use std::time::Duration;

use rand::Rng;

use crate::config::PollerConfig;

// == Backoff ==
/// Wait before jitter after `consecutive_failures` failed polls.
///
/// `base_ms` with no failures, otherwise `min(2^n * base_ms, max_ms)`.
pub fn backoff_interval_ms(consecutive_failures: u32, base_ms: u64, max_ms: u64) -> u64 {
    if consecutive_failures == 0 {
        return base_ms;
    }
    let factor = 1u64.checked_shl(consecutive_failures).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

// == Jitter ==
/// Random extra wait for an interval of `interval_ms`.
///
/// Always non-zero. For `interval_ms * jitter_pct >= 2` the result lies in
/// `(interval_ms * jitter_pct / 2, interval_ms * jitter_pct]`.
pub fn jitter_ms<R: Rng + ?Sized>(interval_ms: u64, jitter_pct: f64, rng: &mut R) -> u64 {
    let half = interval_ms as f64 * jitter_pct / 2.0;
    let other = ((rng.gen::<f64>() * half).floor() as u64).max(1);
    half.floor() as u64 + other
}

/// Full wait before the next poll: backed-off interval plus its jitter.
pub fn next_wait<R: Rng + ?Sized>(
    consecutive_failures: u32,
    config: &PollerConfig,
    rng: &mut R,
) -> Duration {
    let interval = backoff_interval_ms(
        consecutive_failures,
        config.base_polling_interval_ms,
        config.max_polling_interval_ms,
    );
    let jitter = jitter_ms(interval, config.jitter_pct, rng);
    Duration::from_millis(interval.saturating_add(jitter))
}
