//! Wall-clock abstraction.
//!
//! The whole system runs at one-second granularity, so the clock is an epoch
//! second counter. Threads never read the OS clock directly; they hold a
//! [`Clock`] handle, which lets tests drive time by hand.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Monotonically non-decreasing epoch second counter.
pub trait Clock: Send + Sync + 'static {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Clock backed by the system wall clock.
///
/// Guards against the wall clock stepping backwards: reads never return a
/// value smaller than a previously returned one.
#[derive(Debug, Default)]
pub struct SystemClock {
    floor: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        let wall = Utc::now().timestamp();
        self.floor.fetch_max(wall, Ordering::Relaxed).max(wall)
    }
}

/// Hand-driven clock for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Advance the clock by `secs` and return the new time.
    pub fn advance(&self, secs: i64) -> i64 {
        self.now.fetch_add(secs, Ordering::Relaxed) + secs
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        assert_eq!(clock.advance(5), 105);
        assert_eq!(clock.now(), 105);
    }

    #[test]
    fn system_clock_is_plausible() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(a > 1_600_000_000);
        assert!(b >= a);
    }
}
