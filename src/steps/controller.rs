use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::activity::{ActivityPatch, ActivityStore};

use super::{
    loop_worker::step_loop,
    sensor::steps_since_midnight,
    stats::{weekly_step_stats, WeeklyStepStats},
    StepSensor, StepSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum StartOutcome {
    Started { historical_steps: u64 },
    AlreadyTracking,
    /// No pedometer, or it refused to start a watch. Nothing is tracked.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTrackingStatus {
    pub is_tracking: bool,
    pub today_steps: u64,
    pub is_available: bool,
}

#[derive(Default)]
struct Worker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

/// Feeds the device pedometer into today's activity record.
#[derive(Clone)]
pub struct StepTracker {
    sensor: Arc<dyn StepSensor>,
    store: ActivityStore,
    session: Arc<Mutex<Option<StepSession>>>,
    worker: Arc<Mutex<Worker>>,
}

impl StepTracker {
    pub fn new(sensor: Arc<dyn StepSensor>, store: ActivityStore) -> Self {
        Self {
            sensor,
            store,
            session: Arc::new(Mutex::new(None)),
            worker: Arc::new(Mutex::new(Worker::default())),
        }
    }

    pub async fn is_available(&self) -> bool {
        self.sensor.is_available().await
    }

    /// Seed today's steps from the device history, then follow the live
    /// counter until [`StepTracker::stop`].
    pub async fn start(&self) -> Result<StartOutcome> {
        let mut worker = self.worker.lock().await;
        if worker.handle.is_some() {
            return Ok(StartOutcome::AlreadyTracking);
        }

        if !self.sensor.is_available().await {
            warn!("Step counting not available on this device");
            return Ok(StartOutcome::Unavailable);
        }

        let today = self.store.today();
        let now = self.store.clock().now_local();
        let historical = match steps_since_midnight(self.sensor.as_ref(), today, now).await {
            Ok(historical) => {
                // Absolute: the device history already is today's total so far.
                self.store.update(ActivityPatch::steps(historical)).await;
                historical
            }
            Err(err) => {
                // Keep what was already recorded rather than resetting it.
                warn!("Keeping recorded steps, {err:#}");
                self.store.get_current().await.steps
            }
        };

        let readings = match self.sensor.watch().await {
            Ok(readings) => readings,
            Err(err) => {
                warn!("Step sensor refused to start watching: {err:#}");
                return Ok(StartOutcome::Unavailable);
            }
        };

        *self.session.lock().await = Some(StepSession::start(today, historical));

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(step_loop(
            readings,
            self.store.clone(),
            self.sensor.clone(),
            self.session.clone(),
            cancel_token.clone(),
        ));

        worker.handle = Some(handle);
        worker.cancel_token = Some(cancel_token);

        info!("Step tracking started with {historical} historical steps");
        Ok(StartOutcome::Started {
            historical_steps: historical,
        })
    }

    /// Readings already delivered by the sensor are applied before the loop
    /// exits; anything after is not attributed until the next `start`.
    pub async fn stop(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;

        if let Some(token) = worker.cancel_token.take() {
            token.cancel();
        }

        let Some(handle) = worker.handle.take() else {
            return Ok(());
        };

        let joined = handle.await.context("step loop task failed to join");
        self.sensor.stop_watch().await;

        if let Some(session) = self.session.lock().await.as_mut() {
            session.stop();
        }

        info!("Step tracking stopped");
        joined
    }

    pub async fn is_tracking(&self) -> bool {
        self.worker.lock().await.handle.is_some()
    }

    pub async fn session(&self) -> Option<StepSession> {
        self.session.lock().await.clone()
    }

    pub async fn status(&self) -> StepTrackingStatus {
        StepTrackingStatus {
            is_tracking: self.is_tracking().await,
            today_steps: self.store.get_current().await.steps,
            is_available: self.sensor.is_available().await,
        }
    }

    pub async fn weekly_stats(&self) -> WeeklyStepStats {
        weekly_step_stats(self.sensor.as_ref(), self.store.today()).await
    }
}
