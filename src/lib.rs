pub mod activity;
pub mod config;
pub mod db;
pub mod notifications;
pub mod settings;
pub mod steps;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use activity::{ActivityBus, ActivityStore, DailyActivityRecord, Subscription};
use config::RuntimeConfig;
use db::{Database, KeyValueStore, MemoryStore};
use notifications::{
    ContentBuilder, DedupLedger, NotificationEngine, NotificationHost, StaticWeather,
    TokioNotificationHost, WeatherProvider,
};
use settings::SettingsStore;
use steps::{StartOutcome, StepSensor, StepTracker, UnavailableSensor};
use utils::{Clock, SystemClock};

/// The daily activity services wired over one shared key/value store.
///
/// Everything is constructed explicitly, so several engines can coexist
/// (each test builds its own).
#[derive(Clone)]
pub struct ActivityEngine {
    store: ActivityStore,
    steps: StepTracker,
    notifications: NotificationEngine,
}

impl ActivityEngine {
    pub async fn new(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        sensor: Arc<dyn StepSensor>,
        host: Arc<dyn NotificationHost>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Self {
        let store = ActivityStore::new(kv.clone(), ActivityBus::new(), clock);
        let steps = StepTracker::new(sensor, store.clone());
        let settings = Arc::new(SettingsStore::open(kv.clone()).await);
        let notifications = NotificationEngine::new(
            host,
            store.clone(),
            DedupLedger::new(kv),
            settings,
            ContentBuilder::new(weather),
        );

        Self {
            store,
            steps,
            notifications,
        }
    }

    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    pub fn steps(&self) -> &StepTracker {
        &self.steps
    }

    pub fn notifications(&self) -> &NotificationEngine {
        &self.notifications
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DailyActivityRecord) + Send + Sync + 'static,
    {
        self.store.bus().subscribe(handler)
    }

    /// Stop the pedometer and snapshot today so the day survives even if the
    /// process is never started again.
    pub async fn shutdown(&self) -> Result<()> {
        let stopped = self.steps.stop().await;
        self.store.archive().await;
        stopped
    }
}

fn open_store(config: &RuntimeConfig) -> Arc<dyn KeyValueStore> {
    if config.in_memory {
        info!("Using in-memory store");
        return Arc::new(MemoryStore::new());
    }

    match Database::new(config.db_path()) {
        Ok(database) => Arc::new(database),
        Err(err) => {
            warn!("Falling back to in-memory store: {err:#}");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn serve(config: RuntimeConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let kv = open_store(&config);
    let (host, fired) = TokioNotificationHost::new(clock.clone());

    let engine = ActivityEngine::new(
        kv,
        clock,
        Arc::new(UnavailableSensor),
        Arc::new(host),
        Arc::new(StaticWeather::default()),
    )
    .await;

    let _logger = engine.subscribe(|record| {
        info!(
            "Activity for {}: {} steps, {} glasses, {} workouts",
            record.date, record.steps, record.hydration_glasses, record.workouts_completed
        );
    });

    let scheduled = engine.notifications().schedule_all().await?;
    info!("{scheduled} reminders scheduled");

    let cancel_token = CancellationToken::new();
    let dispatcher = {
        let notifications = engine.notifications().clone();
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move { notifications.run(fired, cancel_token).await })
    };

    match engine.steps().start().await? {
        StartOutcome::Started { historical_steps } => {
            info!("Tracking steps from {historical_steps}")
        }
        StartOutcome::AlreadyTracking => {}
        StartOutcome::Unavailable => info!("No step sensor, steps are manual only"),
    }

    let today = engine.store().get_current().await;
    info!("FitFusion ready for {}", today.date);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");

    cancel_token.cancel();
    dispatcher.await.context("notification dispatcher failed to join")?;
    engine.shutdown().await
}

pub fn run() {
    let config = RuntimeConfig::from_env();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .init();

    log::info!("FitFusion starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            return;
        }
    };

    if let Err(err) = runtime.block_on(serve(config)) {
        error!("FitFusion stopped with an error: {err:#}");
    }
}
