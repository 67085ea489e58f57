//! Time abstraction for testability.
//!
//! Observation timestamps and subscription creation times come from a
//! [`Clock`] so tests can pin them.

use std::time::{Duration, SystemTime};

/// Abstraction over wall-clock time.
///
/// # Example
///
/// ```
/// use basewatch::time::{Clock, SystemClock};
///
/// let now = SystemClock.now();
/// assert!(now >= std::time::SystemTime::UNIX_EPOCH);
/// ```
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// Production clock delegating to [`SystemTime::now()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock frozen at a fixed instant.
///
/// Useful for deterministic timestamps in tests and examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub SystemTime);

impl FixedClock {
    /// Creates a clock frozen `secs` seconds after the Unix epoch.
    #[must_use]
    pub fn at_unix(secs: u64) -> Self {
        Self(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Seconds since the Unix epoch; pre-epoch times clamp to 0.
#[must_use]
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_returns_current_time() {
        let before = SystemTime::now();
        let result = SystemClock.now();
        let after = SystemTime::now();

        assert!(result >= before);
        assert!(result <= after);
    }

    #[test]
    fn fixed_clock_never_moves() {
        let clock = FixedClock::at_unix(1_700_000_000);

        assert_eq!(clock.now(), clock.now());
        assert_eq!(unix_seconds(clock.now()), 1_700_000_000);
    }

    #[test]
    fn unix_seconds_clamps_pre_epoch() {
        let before_epoch = SystemTime::UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(unix_seconds(before_epoch), 0);
    }

    #[test]
    fn clocks_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SystemClock>();
        assert_send_sync::<FixedClock>();
    }
}
