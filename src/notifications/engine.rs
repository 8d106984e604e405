use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    activity::ActivityStore,
    settings::{validate_time, ScheduleConfig, SettingsStore},
};

use super::{
    ContentBuilder, DailyTrigger, DedupLedger, Notification, NotificationHost, NotificationKind,
};

// Set to true to log every trigger fire
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// What happened when a trigger went off.
#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    Dispatched(Notification),
    /// Already dispatched today.
    Suppressed,
    /// Turned off in the schedule config.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationState {
    Unscheduled,
    Scheduled,
    DispatchedToday,
}

struct EngineInner {
    host: Arc<dyn NotificationHost>,
    store: ActivityStore,
    ledger: DedupLedger,
    settings: Arc<SettingsStore>,
    content: ContentBuilder,
    scheduled: Mutex<BTreeMap<NotificationKind, DailyTrigger>>,
    /// Days dispatched by this process; covers ledger writes that failed.
    dispatched: Mutex<HashMap<NotificationKind, NaiveDate>>,
    dispatch_lock: Mutex<()>,
}

/// Recurring reminders with at-most-once-per-day delivery per kind.
///
/// Triggers live in the host; the engine only keeps track of what it asked
/// for. Whether a fire turns into a notification is decided here, against the
/// persisted [`DedupLedger`], so relaunches that re-fire a trigger are harmless.
#[derive(Clone)]
pub struct NotificationEngine {
    inner: Arc<EngineInner>,
}

impl NotificationEngine {
    pub fn new(
        host: Arc<dyn NotificationHost>,
        store: ActivityStore,
        ledger: DedupLedger,
        settings: Arc<SettingsStore>,
        content: ContentBuilder,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                host,
                store,
                ledger,
                settings,
                content,
                scheduled: Mutex::new(BTreeMap::new()),
                dispatched: Mutex::new(HashMap::new()),
                dispatch_lock: Mutex::new(()),
            }),
        }
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.inner.ledger
    }

    pub fn config(&self) -> ScheduleConfig {
        self.inner.settings.schedule()
    }

    /// Register a daily trigger for `kind`, replacing any earlier one.
    pub async fn schedule(&self, kind: NotificationKind, hour: u32, minute: u32) -> Result<()> {
        validate_time(hour, minute)?;
        let trigger = DailyTrigger::daily(hour, minute);

        let mut scheduled = self.inner.scheduled.lock().await;
        self.inner
            .host
            .cancel(kind.id())
            .await
            .with_context(|| format!("failed to cancel existing {kind} trigger"))?;
        scheduled.remove(&kind);

        self.inner
            .host
            .register(kind.id(), trigger)
            .await
            .with_context(|| format!("failed to schedule {kind}"))?;
        scheduled.insert(kind, trigger);

        log_info!("scheduled {kind} daily at {hour:02}:{minute:02}");
        Ok(())
    }

    pub async fn unschedule(&self, kind: NotificationKind) -> Result<()> {
        let mut scheduled = self.inner.scheduled.lock().await;
        self.inner
            .host
            .cancel(kind.id())
            .await
            .with_context(|| format!("failed to cancel {kind} trigger"))?;
        scheduled.remove(&kind);
        Ok(())
    }

    /// Bring the host's triggers in line with the stored config. Returns how
    /// many kinds ended up scheduled.
    pub async fn schedule_all(&self) -> Result<usize> {
        let config = self.config();
        if !config.enabled {
            self.cancel_all().await?;
            log_info!("notifications disabled, all triggers cancelled");
            return Ok(0);
        }

        let mut count = 0;
        for kind in NotificationKind::ALL {
            if config.is_enabled(kind) {
                let slot = config.slot(kind);
                self.schedule(kind, slot.hour, slot.minute).await?;
                count += 1;
            } else {
                self.unschedule(kind).await?;
            }
        }
        Ok(count)
    }

    /// Persist `config` and reschedule from it.
    pub async fn update_config(&self, config: ScheduleConfig) -> Result<usize> {
        self.inner.settings.update_schedule(config).await?;
        self.schedule_all().await
    }

    /// Removes every trigger. The ledger is left alone, so kinds already sent
    /// today stay suppressed if they are scheduled again.
    pub async fn cancel_all(&self) -> Result<()> {
        let mut scheduled = self.inner.scheduled.lock().await;
        self.inner
            .host
            .cancel_all()
            .await
            .context("failed to cancel notification triggers")?;
        scheduled.clear();
        Ok(())
    }

    pub async fn scheduled(&self) -> BTreeMap<NotificationKind, DailyTrigger> {
        self.inner.scheduled.lock().await.clone()
    }

    pub async fn state(&self, kind: NotificationKind) -> NotificationState {
        if !self.inner.scheduled.lock().await.contains_key(&kind) {
            return NotificationState::Unscheduled;
        }
        let today = self.inner.store.today();
        if self.was_sent_on(kind, today).await {
            NotificationState::DispatchedToday
        } else {
            NotificationState::Scheduled
        }
    }

    /// Host callback for a fired trigger.
    pub async fn on_trigger_fired(&self, kind: NotificationKind) -> Result<FireOutcome> {
        let _guard = self.inner.dispatch_lock.lock().await;

        if !self.config().is_enabled(kind) {
            log_debug!("{kind} fired while disabled, ignoring");
            return Ok(FireOutcome::Disabled);
        }

        let today = self.inner.store.today();
        if self.was_sent_on(kind, today).await {
            log_info!("{kind} already sent on {today}, suppressing");
            return Ok(FireOutcome::Suppressed);
        }

        let notification = self.compose(kind).await;
        self.inner
            .host
            .present(&notification)
            .await
            .with_context(|| format!("failed to present {kind}"))?;

        self.inner.dispatched.lock().await.insert(kind, today);
        if let Err(err) = self.inner.ledger.mark_sent(kind, today).await {
            log_error!("{kind} was presented but could not be recorded: {err:#}");
        }
        Ok(FireOutcome::Dispatched(notification))
    }

    pub async fn on_trigger_fired_id(&self, identifier: &str) -> Result<FireOutcome> {
        let kind: NotificationKind = identifier.parse()?;
        self.on_trigger_fired(kind).await
    }

    /// Present `kind` right away. Skips both the config and the ledger.
    pub async fn send_now(&self, kind: NotificationKind) -> Result<Notification> {
        let notification = self.compose(kind).await;
        self.inner
            .host
            .present(&notification)
            .await
            .with_context(|| format!("failed to present {kind}"))?;
        Ok(notification)
    }

    /// Drain fired identifiers from the host until cancelled.
    pub async fn run(
        &self,
        mut fired: mpsc::UnboundedReceiver<String>,
        cancel_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                identifier = fired.recv() => {
                    let Some(identifier) = identifier else {
                        log_info!("trigger channel closed");
                        break;
                    };
                    match self.on_trigger_fired_id(&identifier).await {
                        Ok(FireOutcome::Dispatched(notification)) => {
                            log_info!("dispatched {} ({})", notification.kind, notification.id);
                        }
                        Ok(_) => {}
                        Err(err) => log_warn!("trigger {identifier} failed: {err:#}"),
                    }
                }
                _ = cancel_token.cancelled() => {
                    log_info!("notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn was_sent_on(&self, kind: NotificationKind, day: NaiveDate) -> bool {
        if self.inner.dispatched.lock().await.get(&kind) == Some(&day) {
            return true;
        }
        self.inner.ledger.was_sent_on(kind, day).await
    }

    async fn compose(&self, kind: NotificationKind) -> Notification {
        let record = self.inner.store.get_current().await;
        let content = self.inner.content.build(kind, &record).await;
        Notification::new(kind, content, self.inner.store.clock().now_local())
    }
}
