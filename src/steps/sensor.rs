use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::mpsc;

use crate::utils::local_midnight;

/// Device pedometer.
#[async_trait]
pub trait StepSensor: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Steps the device itself recorded in `[start, end)`.
    async fn historical_count(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<u64>;

    /// Begin a watch session. Each item is the cumulative count since this
    /// call; the stream may restart from zero if the sensor is reset.
    async fn watch(&self) -> Result<mpsc::Receiver<u64>>;

    async fn stop_watch(&self);
}

/// Stand-in for hosts without a pedometer.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSensor;

#[async_trait]
impl StepSensor for UnavailableSensor {
    async fn is_available(&self) -> bool {
        false
    }

    async fn historical_count(&self, _start: NaiveDateTime, _end: NaiveDateTime) -> Result<u64> {
        bail!("step counting is not available on this device")
    }

    async fn watch(&self) -> Result<mpsc::Receiver<u64>> {
        bail!("step counting is not available on this device")
    }

    async fn stop_watch(&self) {}
}

/// Steps recorded between local midnight of `day` and `now`.
pub async fn steps_since_midnight(
    sensor: &dyn StepSensor,
    day: NaiveDate,
    now: NaiveDateTime,
) -> Result<u64> {
    sensor
        .historical_count(local_midnight(day), now)
        .await
        .with_context(|| format!("historical step query for {day} failed"))
}
