//! Wall-clock sources, measured in whole Unix seconds

use std::cell::Cell;

use chrono::Utc;

/// Something that can tell the current time
pub trait Clock {
    /// Current time as Unix seconds
    fn now(&self) -> i64;
}

/// The system's real-time clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct FixedClock {
    now: Cell<i64>,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, seconds: i64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> i64 {
        (**self).now()
    }
}
