use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    db::KeyValueStore,
    utils::{trailing_days, Clock},
};

use super::{ActivityBus, ActivityField, ActivityPatch, DailyActivityRecord};

pub const ACTIVITY_STORAGE_KEY: &str = "fitfusion_daily_activity";

/// Longest series `history` will build, roughly a century.
pub const MAX_HISTORY_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Where the record handed out by a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Stored,
    Created,
}

/// Owner of today's [`DailyActivityRecord`].
///
/// Every mutation runs under one async mutex, so concurrent `increment`s
/// compose instead of overwriting each other, and change events reach the
/// bus in the same order the writes hit storage.
///
/// Storage failures never escape: reads fall back to a default record and
/// failed writes are logged while the in-memory result is still returned.
#[derive(Clone)]
pub struct ActivityStore {
    kv: Arc<dyn KeyValueStore>,
    bus: ActivityBus,
    clock: Arc<dyn Clock>,
    storage_key: Arc<str>,
    write_lock: Arc<Mutex<()>>,
}

impl ActivityStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, bus: ActivityBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            bus,
            clock,
            storage_key: Arc::from(ACTIVITY_STORAGE_KEY),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        let storage_key: String = storage_key.into();
        self.storage_key = Arc::from(storage_key);
        self
    }

    pub fn bus(&self) -> &ActivityBus {
        &self.bus
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn archive_key(&self, day: NaiveDate) -> String {
        format!("{}_{}", self.storage_key, day.format("%Y-%m-%d"))
    }

    /// Today's record, rolling over a stale one first.
    pub async fn get_current(&self) -> DailyActivityRecord {
        let _guard = self.write_lock.lock().await;
        let (record, _) = self.load_or_roll(self.clock.today()).await;
        record
    }

    /// Replace the fields present in `patch` and publish the result.
    pub async fn update(&self, patch: ActivityPatch) -> DailyActivityRecord {
        let _guard = self.write_lock.lock().await;
        let today = self.clock.today();
        let (mut record, _) = self.load_or_roll(today).await;

        patch.apply_to(&mut record);
        record.date = today;

        self.persist_current(&record).await;
        self.bus.publish(&record);
        record
    }

    /// Add `amount` to one counter. Only hydration accepts negative amounts.
    pub async fn increment(
        &self,
        field: ActivityField,
        amount: i64,
    ) -> Result<DailyActivityRecord> {
        self.apply_increments(&[(field, amount)]).await
    }

    /// Several counter adjustments persisted as a single write and a single
    /// event. Rejected as a whole if any amount is invalid for its field.
    pub async fn apply_increments(
        &self,
        increments: &[(ActivityField, i64)],
    ) -> Result<DailyActivityRecord> {
        let _guard = self.write_lock.lock().await;
        let today = self.clock.today();
        let (mut record, _) = self.load_or_roll(today).await;

        record.apply_increments(increments)?;
        record.date = today;

        self.persist_current(&record).await;
        self.bus.publish(&record);
        Ok(record)
    }

    /// Credit a finished workout to today in one write.
    pub async fn complete_workout(
        &self,
        calories: u32,
        active_minutes: u32,
    ) -> Result<DailyActivityRecord> {
        self.apply_increments(&[
            (ActivityField::WorkoutsCompleted, 1),
            (ActivityField::Calories, i64::from(calories)),
            (ActivityField::ActiveMinutes, i64::from(active_minutes)),
        ])
        .await
    }

    /// Snapshot today's record into its day-keyed slot.
    pub async fn archive(&self) {
        let _guard = self.write_lock.lock().await;
        let (record, _) = self.load_or_roll(self.clock.today()).await;
        match self.write_archive(&record).await {
            Ok(()) => info!("Activity archived for {}", record.date),
            Err(err) => warn!("Failed to archive activity for {}: {err:#}", record.date),
        }
    }

    /// One record per day for the `days` days ending today, capped at
    /// [`MAX_HISTORY_DAYS`]. Missing days are filled with default records so
    /// the series is always dense.
    pub async fn history(&self, days: u32, order: HistoryOrder) -> Vec<DailyActivityRecord> {
        let today = self.clock.today();
        let (current, origin) = {
            let _guard = self.write_lock.lock().await;
            self.load_or_roll(today).await
        };

        let days = days.min(MAX_HISTORY_DAYS);
        let mut history = Vec::with_capacity(days as usize);
        for day in trailing_days(today, days) {
            if day == today && origin == Origin::Stored {
                history.push(current.clone());
                continue;
            }

            let record = match self.read_record(&self.archive_key(day)).await {
                Ok(Some(record)) => record,
                Ok(None) => DailyActivityRecord::new(day),
                Err(err) => {
                    warn!("Failed to read archived activity for {day}: {err:#}");
                    DailyActivityRecord::new(day)
                }
            };
            history.push(record);
        }

        if order == HistoryOrder::NewestFirst {
            history.reverse();
        }
        history
    }

    /// Delete the current record and every archived day.
    pub async fn reset_all(&self) {
        let _guard = self.write_lock.lock().await;
        let result = async {
            let keys: Vec<String> = self
                .kv
                .get_all_keys()
                .await?
                .into_iter()
                .filter(|key| key.starts_with(&*self.storage_key))
                .collect();
            self.kv.multi_remove(&keys).await?;
            Ok::<usize, anyhow::Error>(keys.len())
        }
        .await;

        match result {
            Ok(removed) => info!("Cleared {removed} activity entries"),
            Err(err) => warn!("Failed to clear activity data: {err:#}"),
        }
    }

    /// Must be called with `write_lock` held.
    async fn load_or_roll(&self, today: NaiveDate) -> (DailyActivityRecord, Origin) {
        match self.read_record(&self.storage_key).await {
            Ok(Some(record)) if record.date == today => (record, Origin::Stored),
            Ok(Some(stale)) => {
                info!("Rolling activity over from {} to {today}", stale.date);
                if let Err(err) = self.write_archive(&stale).await {
                    warn!("Failed to archive {} during rollover: {err:#}", stale.date);
                }
                let (record, origin) = self.archived_or_fresh(today).await;
                self.persist_current(&record).await;
                self.bus.publish(&record);
                (record, origin)
            }
            Ok(None) => {
                let (record, origin) = self.archived_or_fresh(today).await;
                self.persist_current(&record).await;
                (record, origin)
            }
            Err(err) => {
                warn!("Failed to read current activity, using defaults: {err:#}");
                (DailyActivityRecord::new(today), Origin::Created)
            }
        }
    }

    /// A day can come back after the clock moved backwards; its archive
    /// then becomes current again instead of a blank record.
    async fn archived_or_fresh(&self, today: NaiveDate) -> (DailyActivityRecord, Origin) {
        match self.read_record(&self.archive_key(today)).await {
            Ok(Some(archived)) if archived.date == today => {
                info!("Restored archived activity for {today}");
                (archived, Origin::Stored)
            }
            Ok(_) => (DailyActivityRecord::new(today), Origin::Created),
            Err(err) => {
                warn!("Failed to read archived activity for {today}: {err:#}");
                (DailyActivityRecord::new(today), Origin::Created)
            }
        }
    }

    async fn read_record(&self, key: &str) -> Result<Option<DailyActivityRecord>> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        let mut record: DailyActivityRecord = serde_json::from_str(&raw)
            .with_context(|| format!("failed to decode activity record at '{key}'"))?;
        record.normalize();
        Ok(Some(record))
    }

    async fn write_archive(&self, record: &DailyActivityRecord) -> Result<()> {
        let serialized = serde_json::to_string(record)?;
        self.kv
            .set(&self.archive_key(record.date), serialized)
            .await
            .with_context(|| format!("failed to archive activity for {}", record.date))
    }

    async fn persist_current(&self, record: &DailyActivityRecord) {
        let result = match serde_json::to_string(record) {
            Ok(serialized) => self.kv.set(&self.storage_key, serialized).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            warn!("Failed to persist activity for {}: {err:#}", record.date);
        }
    }
}
