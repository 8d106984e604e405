use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MAX_HYDRATION_GLASSES: u32 = 12;
pub const MAX_SLEEP_HOURS: f64 = 24.0;
pub const MAX_WELLNESS_SCORE: u8 = 10;

pub const DEFAULT_SLEEP_HOURS: f64 = 7.0;
pub const DEFAULT_STRESS_LEVEL: u8 = 5;
pub const DEFAULT_MOOD_SCORE: u8 = 7;
pub const DEFAULT_SORENESS: u8 = 3;

fn default_sleep_hours() -> f64 {
    DEFAULT_SLEEP_HOURS
}

fn default_stress_level() -> u8 {
    DEFAULT_STRESS_LEVEL
}

fn default_mood_score() -> u8 {
    DEFAULT_MOOD_SCORE
}

fn default_soreness() -> u8 {
    DEFAULT_SORENESS
}

/// Aggregated metrics for one activity day.
///
/// Counters only grow through [`DailyActivityRecord::apply_increments`];
/// wellness fields are replaced wholesale through an [`ActivityPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivityRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub steps: u64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub active_minutes: u32,
    #[serde(default, alias = "hydration")]
    pub hydration_glasses: u32,
    #[serde(default)]
    pub workouts_completed: u32,
    #[serde(default = "default_sleep_hours", alias = "sleep")]
    pub sleep_hours: f64,
    #[serde(default = "default_stress_level", alias = "stress")]
    pub stress_level: u8,
    #[serde(default = "default_mood_score", alias = "mood")]
    pub mood_score: u8,
    #[serde(default = "default_soreness")]
    pub soreness: u8,
}

impl DailyActivityRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            steps: 0,
            calories: 0.0,
            active_minutes: 0,
            hydration_glasses: 0,
            workouts_completed: 0,
            sleep_hours: DEFAULT_SLEEP_HOURS,
            stress_level: DEFAULT_STRESS_LEVEL,
            mood_score: DEFAULT_MOOD_SCORE,
            soreness: DEFAULT_SORENESS,
        }
    }

    /// Pull every field back inside its valid range.
    pub fn normalize(&mut self) {
        self.calories = non_negative(self.calories);
        self.hydration_glasses = self.hydration_glasses.min(MAX_HYDRATION_GLASSES);
        self.sleep_hours = non_negative(self.sleep_hours).min(MAX_SLEEP_HOURS);
        self.stress_level = self.stress_level.min(MAX_WELLNESS_SCORE);
        self.mood_score = self.mood_score.min(MAX_WELLNESS_SCORE);
        self.soreness = self.soreness.min(MAX_WELLNESS_SCORE);
    }

    /// Apply every `(field, amount)` pair or none of them.
    pub fn apply_increments(&mut self, increments: &[(ActivityField, i64)]) -> Result<()> {
        for (field, amount) in increments {
            if *amount < 0 && !field.allows_decrement() {
                bail!("{field} cannot be decremented (amount {amount})");
            }
        }

        for (field, amount) in increments {
            let amount = *amount;
            match field {
                ActivityField::Steps => {
                    self.steps = self.steps.saturating_add(amount.unsigned_abs());
                }
                ActivityField::Calories => {
                    self.calories = non_negative(self.calories + amount as f64);
                }
                ActivityField::ActiveMinutes => {
                    self.active_minutes = offset_u32(self.active_minutes, amount);
                }
                ActivityField::HydrationGlasses => {
                    self.hydration_glasses =
                        offset_u32(self.hydration_glasses, amount).min(MAX_HYDRATION_GLASSES);
                }
                ActivityField::WorkoutsCompleted => {
                    self.workouts_completed = offset_u32(self.workouts_completed, amount);
                }
            }
        }

        Ok(())
    }

    pub fn counter(&self, field: ActivityField) -> f64 {
        match field {
            ActivityField::Steps => self.steps as f64,
            ActivityField::Calories => self.calories,
            ActivityField::ActiveMinutes => f64::from(self.active_minutes),
            ActivityField::HydrationGlasses => f64::from(self.hydration_glasses),
            ActivityField::WorkoutsCompleted => f64::from(self.workouts_completed),
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn offset_u32(current: u32, amount: i64) -> u32 {
    let next = i64::from(current).saturating_add(amount).max(0);
    u32::try_from(next).unwrap_or(u32::MAX)
}

/// Numeric counters that can be adjusted relatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityField {
    Steps,
    Calories,
    ActiveMinutes,
    HydrationGlasses,
    WorkoutsCompleted,
}

impl ActivityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityField::Steps => "steps",
            ActivityField::Calories => "calories",
            ActivityField::ActiveMinutes => "activeMinutes",
            ActivityField::HydrationGlasses => "hydrationGlasses",
            ActivityField::WorkoutsCompleted => "workoutsCompleted",
        }
    }

    /// Hydration is the only counter a user can take back (a mis-tapped glass).
    pub fn allows_decrement(&self) -> bool {
        matches!(self, ActivityField::HydrationGlasses)
    }
}

impl fmt::Display for ActivityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "steps" => Ok(ActivityField::Steps),
            "calories" => Ok(ActivityField::Calories),
            "activeMinutes" => Ok(ActivityField::ActiveMinutes),
            "hydrationGlasses" | "hydration" => Ok(ActivityField::HydrationGlasses),
            "workoutsCompleted" => Ok(ActivityField::WorkoutsCompleted),
            other => Err(anyhow!("unknown activity field '{other}'")),
        }
    }
}

/// Partial replacement of a record's fields. The date is never patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "hydration")]
    pub hydration_glasses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workouts_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "sleep")]
    pub sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "stress")]
    pub stress_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "mood")]
    pub mood_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soreness: Option<u8>,
}

impl ActivityPatch {
    pub fn steps(steps: u64) -> Self {
        Self {
            steps: Some(steps),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, record: &mut DailyActivityRecord) {
        if let Some(steps) = self.steps {
            record.steps = steps;
        }
        if let Some(calories) = self.calories {
            record.calories = calories;
        }
        if let Some(active_minutes) = self.active_minutes {
            record.active_minutes = active_minutes;
        }
        if let Some(hydration) = self.hydration_glasses {
            record.hydration_glasses = hydration;
        }
        if let Some(workouts) = self.workouts_completed {
            record.workouts_completed = workouts;
        }
        if let Some(sleep) = self.sleep_hours {
            record.sleep_hours = sleep;
        }
        if let Some(stress) = self.stress_level {
            record.stress_level = stress;
        }
        if let Some(mood) = self.mood_score {
            record.mood_score = mood;
        }
        if let Some(soreness) = self.soreness {
            record.soreness = soreness;
        }
        record.normalize();
    }
}
