//! Time source for history timestamps and ids.

use chrono::{DateTime, Utc};

/// Source of the current time. Injected so tests can freeze it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out history ids derived from the clock, strictly increasing.
///
/// Two entries created within the same millisecond (or after the clock steps
/// backwards) still get distinct ids: the generator bumps past the last one issued.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    /// Start after the largest id already in use.
    pub fn starting_after(last: i64) -> Self {
        Self { last }
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        self.last = candidate.max(self.last.saturating_add(1));
        self.last
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ids_follow_the_clock() {
        let mut ids = IdGenerator::default();
        let t = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(ids.next(t), 1_700_000_000_000);
        let later = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        assert_eq!(ids.next(later), 1_700_000_000_500);
    }

    #[test]
    fn test_same_tick_ids_are_distinct() {
        let mut ids = IdGenerator::default();
        let t = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a = ids.next(t);
        let b = ids.next(t);
        let c = ids.next(t);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_clock_going_backwards() {
        let mut ids = IdGenerator::starting_after(1_700_000_000_000);
        let earlier = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
        assert_eq!(ids.next(earlier), 1_700_000_000_001);
    }
}
