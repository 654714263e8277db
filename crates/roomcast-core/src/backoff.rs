//! Capped, jittered exponential backoff for backbone reconnects.
//!
//! `delay(attempt) = min(CAP, BASE * 2^attempt) + uniform(0, MAX_JITTER)`

use std::time::Duration;

use rand::Rng;

/// Delay for attempt 0.
pub const BASE: Duration = Duration::from_millis(250);
/// Upper bound of the exponential part.
pub const CAP: Duration = Duration::from_secs(10);
/// Jitter is drawn from `[0, MAX_JITTER)`.
pub const MAX_JITTER: Duration = Duration::from_millis(250);

/// Exponential part only (no jitter). Non-decreasing, saturates at `CAP`.
pub fn base_delay(attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| BASE.checked_mul(factor))
        .map_or(CAP, |d| d.min(CAP))
}

/// Delay before retry number `attempt`, always strictly positive.
pub fn delay(attempt: u32) -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..MAX_JITTER.as_millis() as u64);
    base_delay(attempt) + Duration::from_millis(jitter_ms)
}
