/// ----- CLOCK -----
/// Wall-clock source for the scheduler and predictor. Hour-of-day and
/// day-of-week buckets are taken from local time, so the clock hands out
/// naive local timestamps.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{Duration, Local, NaiveDateTime};

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock. Clones share the same instant, so a harness can keep one
/// handle and move time for a scheduler that owns the other.
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Rc<Cell<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        ManualClock { instant: Rc::new(Cell::new(start)) }
    }

    pub fn set(&self, instant: NaiveDateTime) {
        self.instant.set(instant);
    }

    pub fn advance(&self, by: Duration) {
        self.instant.set(self.instant.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.instant.get()
    }
}
