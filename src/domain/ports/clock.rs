//! Clock port (C1): the monotonic wall-time source every timed decision reads.
//!
//! Abstracting the clock behind a trait lets the periodic drivers (§5) and
//! the Scheduler/Dispatcher be driven deterministically in tests.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Deterministic clock for tests: starts at a fixed instant and can be
    /// advanced explicitly.
    pub struct FixedClock {
        micros: AtomicI64,
    }

    impl FixedClock {
        pub fn at(start: DateTime<Utc>) -> Self {
            Self { micros: AtomicI64::new(start.timestamp_micros()) }
        }

        pub fn advance(&self, duration: chrono::Duration) {
            self.micros.fetch_add(duration.num_microseconds().unwrap_or(0), Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap()
        }
    }
}
