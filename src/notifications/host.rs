use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::Serialize;
use tokio::{sync::mpsc, task::JoinHandle, time};
use uuid::Uuid;

use crate::utils::{day::next_occurrence, Clock};

use super::{NotificationContent, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrigger {
    pub hour: u32,
    pub minute: u32,
    pub repeats: bool,
}

impl DailyTrigger {
    pub fn daily(hour: u32, minute: u32) -> Self {
        Self {
            hour,
            minute,
            repeats: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub fn new(kind: NotificationKind, content: NotificationContent, created_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: content.title,
            body: content.body,
            data: content.data,
            created_at,
        }
    }
}

/// Platform alarm and notification primitive.
///
/// Registered triggers are keyed by identifier; when one goes off the host
/// reports the identifier back to the engine, which decides whether to
/// `present` anything.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    async fn register(&self, identifier: &str, trigger: DailyTrigger) -> Result<()>;

    async fn cancel(&self, identifier: &str) -> Result<()>;

    async fn cancel_all(&self) -> Result<()>;

    /// Show `notification` immediately.
    async fn present(&self, notification: &Notification) -> Result<()>;
}

/// In-process host: each trigger is a tokio task sleeping until its next
/// local wall-clock occurrence. Fired identifiers come out of the receiver
/// returned by [`TokioNotificationHost::new`]; presenting means logging.
pub struct TokioNotificationHost {
    clock: Arc<dyn Clock>,
    fired_tx: mpsc::UnboundedSender<String>,
    triggers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioNotificationHost {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let host = Self {
            clock,
            fired_tx,
            triggers: Mutex::new(HashMap::new()),
        };
        (host, fired_rx)
    }

    pub fn registered(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.triggers().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn triggers(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        match self.triggers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for TokioNotificationHost {
    fn drop(&mut self) {
        for (_, handle) in self.triggers().drain() {
            handle.abort();
        }
    }
}

#[async_trait]
impl NotificationHost for TokioNotificationHost {
    async fn register(&self, identifier: &str, trigger: DailyTrigger) -> Result<()> {
        if next_occurrence(self.clock.now_local(), trigger.hour, trigger.minute).is_none() {
            bail!(
                "invalid trigger time {:02}:{:02} for {identifier}",
                trigger.hour,
                trigger.minute
            );
        }

        let clock = self.clock.clone();
        let fired_tx = self.fired_tx.clone();
        let id = identifier.to_string();

        let handle = tokio::spawn(async move {
            loop {
                let now = clock.now_local();
                let Some(next) = next_occurrence(now, trigger.hour, trigger.minute) else {
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                time::sleep(wait).await;

                if fired_tx.send(id.clone()).is_err() {
                    break;
                }
                if !trigger.repeats {
                    break;
                }
            }
        });

        if let Some(previous) = self.triggers().insert(identifier.to_string(), handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn cancel(&self, identifier: &str) -> Result<()> {
        if let Some(handle) = self.triggers().remove(identifier) {
            handle.abort();
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        for (_, handle) in self.triggers().drain() {
            handle.abort();
        }
        Ok(())
    }

    async fn present(&self, notification: &Notification) -> Result<()> {
        if notification.title.is_empty() && notification.body.is_empty() {
            warn!("Refusing to present empty {} notification", notification.kind);
            bail!("notification {} has no content", notification.id);
        }
        info!(
            "[{}] {}: {}",
            notification.kind, notification.title, notification.body
        );
        Ok(())
    }
}
