//! Time sources consumed by the save manager.

use std::cell::Cell;
use std::time::Instant;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

pub trait Clock {
    /// Monotonic seconds since an arbitrary origin. Drives the write throttle.
    fn realtime_seconds(&self) -> f64;

    fn utc_now(&self) -> DateTime<Utc>;

    fn local_today(&self) -> NaiveDate;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn realtime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Hand-driven clock for deterministic tests and tooling.
#[derive(Clone, Debug)]
pub struct ManualClock {
    seconds: Cell<f64>,
    utc: Cell<DateTime<Utc>>,
    today: Cell<NaiveDate>,
}

impl ManualClock {
    pub fn new(utc: DateTime<Utc>) -> Self {
        Self {
            seconds: Cell::new(0.0),
            utc: Cell::new(utc),
            today: Cell::new(utc.date_naive()),
        }
    }

    /// Moves monotonic and wall time forward together.
    pub fn advance(&self, secs: f64) {
        self.seconds.set(self.seconds.get() + secs);
        let millis = (secs * 1000.0).round() as i64;
        self.utc.set(self.utc.get() + Duration::milliseconds(millis));
    }

    pub fn set_utc(&self, utc: DateTime<Utc>) {
        self.utc.set(utc);
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.today.set(today);
    }
}

impl Clock for ManualClock {
    fn realtime_seconds(&self) -> f64 {
        self.seconds.get()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.utc.get()
    }

    fn local_today(&self) -> NaiveDate {
        self.today.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn realtime_seconds(&self) -> f64 {
        (**self).realtime_seconds()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        (**self).utc_now()
    }

    fn local_today(&self) -> NaiveDate {
        (**self).local_today()
    }
}
