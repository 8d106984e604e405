use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::warn;

use crate::db::KeyValueStore;

use super::NotificationKind;

pub const LEDGER_STORAGE_KEY: &str = "fitfusion_last_notification";

fn day_string(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Last local date each notification kind was dispatched, persisted as one
/// JSON object so the record survives process restarts.
///
/// Callers that check and then mark must hold their own lock around the pair.
#[derive(Clone)]
pub struct DedupLedger {
    kv: Arc<dyn KeyValueStore>,
}

impl DedupLedger {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn entries(&self) -> Result<BTreeMap<String, String>> {
        let Some(raw) = self.kv.get(LEDGER_STORAGE_KEY).await? else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_str(&raw).context("failed to decode notification ledger")
    }

    pub async fn last_sent(&self, kind: NotificationKind) -> Result<Option<NaiveDate>> {
        let entries = self.entries().await?;
        Ok(entries
            .get(kind.id())
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()))
    }

    /// Unreadable ledger counts as "not sent".
    pub async fn was_sent_on(&self, kind: NotificationKind, day: NaiveDate) -> bool {
        match self.entries().await {
            Ok(entries) => entries.get(kind.id()) == Some(&day_string(day)),
            Err(err) => {
                warn!("Failed to read notification ledger: {err:#}");
                false
            }
        }
    }

    pub async fn mark_sent(&self, kind: NotificationKind, day: NaiveDate) -> Result<()> {
        let mut entries = match self.entries().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Rewriting unreadable notification ledger: {err:#}");
                BTreeMap::new()
            }
        };
        entries.insert(kind.id().to_string(), day_string(day));

        let serialized = serde_json::to_string(&entries)?;
        self.kv
            .set(LEDGER_STORAGE_KEY, serialized)
            .await
            .with_context(|| format!("failed to mark {kind} sent for {day}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn marks_are_per_kind_and_per_day() {
        let ledger = DedupLedger::new(Arc::new(MemoryStore::new()));
        ledger.mark_sent(NotificationKind::WaterReminder, day(1)).await.unwrap();

        assert!(ledger.was_sent_on(NotificationKind::WaterReminder, day(1)).await);
        assert!(!ledger.was_sent_on(NotificationKind::WaterReminder, day(2)).await);
        assert!(!ledger.was_sent_on(NotificationKind::MealSuggestion, day(1)).await);

        ledger.mark_sent(NotificationKind::MealSuggestion, day(1)).await.unwrap();
        ledger.mark_sent(NotificationKind::WaterReminder, day(2)).await.unwrap();
        assert_eq!(
            ledger.last_sent(NotificationKind::WaterReminder).await.unwrap(),
            Some(day(2))
        );
        assert_eq!(ledger.entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_ledger_is_treated_as_empty_and_rewritten() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(LEDGER_STORAGE_KEY, "not json".into()).await.unwrap();
        let ledger = DedupLedger::new(kv);

        assert!(!ledger.was_sent_on(NotificationKind::WaterReminder, day(1)).await);
        ledger.mark_sent(NotificationKind::WaterReminder, day(1)).await.unwrap();
        assert!(ledger.was_sent_on(NotificationKind::WaterReminder, day(1)).await);
    }
}
