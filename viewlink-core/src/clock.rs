//! Injected wall-clock source.
//!
//! Frame latency is derived from producer timestamps in Unix epoch
//! milliseconds, so the manager needs a wall clock rather than a
//! monotonic one. Injecting it keeps latency math and age-based
//! eviction testable without sleeping.

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time source in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}
