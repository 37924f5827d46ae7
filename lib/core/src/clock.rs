//! Injectable sources of time and uniqueness.
//!
//! Editing operations never read the wall clock or a random source directly;
//! they receive a [`Clock`] and an [`IdGenerator`] so that callers (and tests)
//! control the timestamps and ids stamped onto new steps.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current instant as epoch milliseconds, the persisted unit.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Creates a clock that always reports `instant`.
    #[must_use]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Creates a clock from epoch milliseconds; out-of-range values clamp to the epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A source of unique id suffixes.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh unique suffix.
    fn next_id(&self) -> String;
}

/// Generates lowercase ULIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}

/// Generates zero-padded sequence numbers starting at `0001`.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    issued: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator whose first id is `0001`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{n:04}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_millis() {
        let clock = FixedClock::from_millis(1_700_000_000_000);
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn sequential_ids_increment() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.next_id(), "0001");
        assert_eq!(ids.next_id(), "0002");
    }

    #[test]
    fn ulid_ids_are_unique() {
        let ids = UlidGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
