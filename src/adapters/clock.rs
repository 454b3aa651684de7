//! Clock adapter (C9).
//!
//! The kernel never derives ordering from wall-clock time (spec §5); wall
//! clock is read only to stamp events. Monotonic reads back durations for
//! TTL/deadline arithmetic. Tests inject [`FakeClock`] for deterministic
//! timestamps, the way the teacher's collaborators are always trait objects
//! so the test suite can swap in in-memory doubles.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Time source used throughout the kernel.
pub trait Clock: Send + Sync {
    /// Wall-clock time, used only for event/audit timestamps.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Monotonic instant, used for durations, TTLs, and deadlines.
    fn monotonic_now(&self) -> Instant;
}

/// Production clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock for tests: wall-clock is an offset from a fixed
/// epoch, advanced explicitly by the test.
pub struct FakeClock {
    offset_seconds: AtomicI64,
    base: DateTime<Utc>,
    mono_base: Instant,
}

impl FakeClock {
    /// Create a fake clock anchored at the given wall-clock instant.
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            offset_seconds: AtomicI64::new(0),
            base,
            mono_base: Instant::now(),
        }
    }

    /// Advance both the wall clock and the monotonic clock by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.offset_seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.base + chrono::Duration::seconds(self.offset_seconds.load(Ordering::SeqCst))
    }

    fn monotonic_now(&self) -> Instant {
        self.mono_base + std::time::Duration::from_secs(
            self.offset_seconds.load(Ordering::SeqCst).max(0) as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_advances() {
        let clock = FakeClock::new(Utc::now());
        let t0 = clock.now_utc();
        clock.advance(60);
        let t1 = clock.now_utc();
        assert_eq!((t1 - t0).num_seconds(), 60);
    }
}
