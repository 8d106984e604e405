use chrono::NaiveDate;
use serde::Serialize;

/// Reconciliation state for one sensor watch session.
///
/// The sensor reports a cumulative count; only forward movement past the
/// last applied reading turns into steps. Resets and duplicates are dropped
/// and never move the baseline backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSession {
    pub day: NaiveDate,
    pub baseline_device_count: u64,
    pub historical_steps_at_start: u64,
    pub applied_steps: u64,
    pub discarded_readings: u64,
    pub is_tracking: bool,
}

impl StepSession {
    pub fn start(day: NaiveDate, historical_steps_at_start: u64) -> Self {
        Self {
            day,
            baseline_device_count: 0,
            historical_steps_at_start,
            applied_steps: 0,
            discarded_readings: 0,
            is_tracking: true,
        }
    }

    /// Positive delta to credit for `cumulative`, if any.
    pub fn observe(&mut self, cumulative: u64) -> Option<u64> {
        if cumulative <= self.baseline_device_count {
            self.discarded_readings += 1;
            return None;
        }

        let delta = cumulative - self.baseline_device_count;
        self.baseline_device_count = cumulative;
        self.applied_steps = self.applied_steps.saturating_add(delta);
        Some(delta)
    }

    /// Restart accounting for a new activity day. The device's own history
    /// becomes the day's total and `cumulative` the new baseline.
    pub fn reanchor(&mut self, day: NaiveDate, historical_steps: u64, cumulative: u64) {
        self.day = day;
        self.historical_steps_at_start = historical_steps;
        self.baseline_device_count = cumulative;
        self.applied_steps = 0;
    }

    pub fn stop(&mut self) {
        self.is_tracking = false;
    }

    /// What the record's step count should read if nothing else wrote to it.
    pub fn expected_total(&self) -> u64 {
        self.historical_steps_at_start
            .saturating_add(self.applied_steps)
    }
}
