//! Exponential backoff schedule for transient fetch failures

use std::time::Duration;

/// Delay before retry number `attempt + 1`: `base * 2^attempt`.
///
/// With the default 1.2s base: 1.2s, 2.4s, 4.8s, ...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
