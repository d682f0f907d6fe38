//! Injectable wall clock for backoff and quota-reset waits

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of "now" plus the ability to block for a duration.
///
/// Every wait in the crawler goes through this trait so tests can observe
/// the requested sleeps without spending real time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Real time: `Utc::now` and `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
