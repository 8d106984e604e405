//! Clock and calendar helpers.
//!
//! Every partition key in the engine is an "activity day": the device-local
//! calendar date of a wall-clock timestamp. Time is read through [`Clock`] so
//! tests can move across midnight deterministically.

use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

pub trait Clock: Send + Sync {
    /// Current device-local wall-clock time.
    fn now_local(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        activity_day(self.now_local())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn at(day: NaiveDate, hour: u32, minute: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        Self::new(day.and_time(time))
    }

    pub fn set(&self, now: NaiveDateTime) {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now_local(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

pub fn activity_day(timestamp: NaiveDateTime) -> NaiveDate {
    timestamp.date()
}

pub fn local_midnight(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// The `count` days ending at `today`, oldest first.
pub fn trailing_days(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .rev()
        .filter_map(|offset| today.checked_sub_signed(Duration::days(i64::from(offset))))
        .collect()
}

/// Next wall-clock occurrence of `hour:minute` strictly after `now`.
pub fn next_occurrence(now: NaiveDateTime, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let candidate = now.date().and_time(time);
    if candidate > now {
        Some(candidate)
    } else {
        now.date().succ_opt().map(|tomorrow| tomorrow.and_time(time))
    }
}
