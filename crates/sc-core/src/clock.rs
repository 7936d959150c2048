//! Time sources for the engine.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

/// Supplies the current instant and calendar day.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// The calendar day `now` falls on.
    fn today(&self) -> NaiveDate;
}

/// Wall clock; days follow the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to. Days follow UTC.
///
/// Clones share the same instant, so a handle kept outside the engine can
/// advance the engine's clock.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.now.get().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 23, 59, 0).unwrap());
        let handle = clock.clone();
        handle.advance(Duration::minutes(2));
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
        );
    }
}
