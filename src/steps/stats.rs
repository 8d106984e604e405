use chrono::{Duration, NaiveDate};
use log::warn;
use serde::Serialize;

use crate::utils::{local_midnight, trailing_days};

use super::StepSensor;

const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStepStats {
    pub total_steps: u64,
    pub daily_average: u64,
    /// Oldest day first, today last.
    pub daily_steps: Vec<u64>,
}

/// Seven-day totals straight from the device's own history. Days the sensor
/// cannot answer for count as zero.
pub async fn weekly_step_stats(sensor: &dyn StepSensor, today: NaiveDate) -> WeeklyStepStats {
    let mut daily_steps = Vec::with_capacity(WEEK_DAYS as usize);
    for day in trailing_days(today, WEEK_DAYS) {
        let start = local_midnight(day);
        let end = start + Duration::days(1);
        let steps = match sensor.historical_count(start, end).await {
            Ok(steps) => steps,
            Err(err) => {
                warn!("Step history for {day} unavailable: {err:#}");
                0
            }
        };
        daily_steps.push(steps);
    }

    let total_steps: u64 = daily_steps.iter().sum();
    let daily_average = (total_steps as f64 / f64::from(WEEK_DAYS)).round() as u64;

    WeeklyStepStats {
        total_steps,
        daily_average,
        daily_steps,
    }
}
