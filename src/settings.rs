use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    db::KeyValueStore,
    notifications::{NotificationKind, ReminderGroup},
};

pub const SCHEDULE_STORAGE_KEY: &str = "fitfusion_notification_schedule";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSlot {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl ReminderSlot {
    pub fn at(hour: u32, minute: u32) -> Self {
        Self {
            enabled: true,
            hour,
            minute,
        }
    }

    fn default_for(kind: NotificationKind) -> Self {
        let (hour, minute) = kind.default_time();
        Self::at(hour, minute)
    }
}

/// User-editable reminder schedule. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub water_reminders_enabled: bool,
    pub meal_reminders_enabled: bool,
    pub motivation_enabled: bool,
    pub reminders: BTreeMap<NotificationKind, ReminderSlot>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            water_reminders_enabled: true,
            meal_reminders_enabled: true,
            motivation_enabled: true,
            reminders: NotificationKind::ALL
                .into_iter()
                .map(|kind| (kind, ReminderSlot::default_for(kind)))
                .collect(),
        }
    }
}

impl ScheduleConfig {
    /// Slot for `kind`, falling back to its default time if the stored
    /// config predates it.
    pub fn slot(&self, kind: NotificationKind) -> ReminderSlot {
        self.reminders
            .get(&kind)
            .copied()
            .unwrap_or_else(|| ReminderSlot::default_for(kind))
    }

    pub fn with_slot(mut self, kind: NotificationKind, slot: ReminderSlot) -> Self {
        self.reminders.insert(kind, slot);
        self
    }

    pub fn group_enabled(&self, group: ReminderGroup) -> bool {
        match group {
            ReminderGroup::Water => self.water_reminders_enabled,
            ReminderGroup::Meal => self.meal_reminders_enabled,
            ReminderGroup::Motivation => self.motivation_enabled,
        }
    }

    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        self.enabled && self.group_enabled(kind.group()) && self.slot(kind).enabled
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, slot) in &self.reminders {
            validate_time(slot.hour, slot.minute).with_context(|| format!("invalid time for {kind}"))?;
        }
        Ok(())
    }
}

pub fn validate_time(hour: u32, minute: u32) -> Result<()> {
    if hour > 23 {
        bail!("hour {hour} is out of range (0-23)");
    }
    if minute > 59 {
        bail!("minute {minute} is out of range (0-59)");
    }
    Ok(())
}

/// Persisted [`ScheduleConfig`] with an in-memory copy for cheap reads.
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    data: RwLock<ScheduleConfig>,
}

impl SettingsStore {
    /// Missing, unreadable or corrupt config all start from defaults.
    pub async fn open(kv: Arc<dyn KeyValueStore>) -> Self {
        let data = match Self::read(kv.as_ref()).await {
            Ok(Some(config)) => config,
            Ok(None) => ScheduleConfig::default(),
            Err(err) => {
                warn!("Failed to load notification schedule, using defaults: {err:#}");
                ScheduleConfig::default()
            }
        };

        Self {
            kv,
            data: RwLock::new(data),
        }
    }

    pub fn schedule(&self) -> ScheduleConfig {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn update_schedule(&self, config: ScheduleConfig) -> Result<()> {
        config.validate()?;
        self.persist(&config).await?;
        match self.data.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        Ok(())
    }

    pub async fn reload(&self) -> Result<()> {
        let config = Self::read(self.kv.as_ref()).await?.unwrap_or_default();
        match self.data.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        Ok(())
    }

    async fn read(kv: &dyn KeyValueStore) -> Result<Option<ScheduleConfig>> {
        let Some(raw) = kv.get(SCHEDULE_STORAGE_KEY).await? else {
            return Ok(None);
        };
        let config: ScheduleConfig =
            serde_json::from_str(&raw).context("failed to decode notification schedule")?;
        Ok(Some(config))
    }

    async fn persist(&self, config: &ScheduleConfig) -> Result<()> {
        let serialized = serde_json::to_string(config)?;
        self.kv
            .set(SCHEDULE_STORAGE_KEY, serialized)
            .await
            .context("failed to write notification schedule")
    }
}
