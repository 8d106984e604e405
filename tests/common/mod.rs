#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::mpsc;

use fitfusion_lib::{
    activity::ActivityStore,
    db::MemoryStore,
    notifications::{
        DailyTrigger, Notification, NotificationHost, StaticWeather, WeatherProvider,
        WeatherReport,
    },
    steps::StepSensor,
    utils::ManualClock,
    ActivityEngine,
};

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

/// Pedometer driven by the test: per-day history plus a live stream fed with
/// [`FakeSensor::emit`].
#[derive(Default)]
pub struct FakeSensor {
    unavailable: AtomicBool,
    fail_history: AtomicBool,
    history: Mutex<HashMap<NaiveDate, u64>>,
    live: Mutex<Option<mpsc::Sender<u64>>>,
    watch_calls: AtomicUsize,
}

impl FakeSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Keep the live stream working but make history queries fail.
    pub fn set_fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn set_history(&self, date: NaiveDate, steps: u64) {
        self.history.lock().unwrap().insert(date, steps);
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    pub fn is_watching(&self) -> bool {
        self.live.lock().unwrap().is_some()
    }

    pub async fn emit(&self, cumulative: u64) {
        let sender = self.live.lock().unwrap().clone();
        let sender = sender.expect("sensor is not being watched");
        sender.send(cumulative).await.unwrap();
    }
}

#[async_trait]
impl StepSensor for FakeSensor {
    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn historical_count(&self, start: NaiveDateTime, _end: NaiveDateTime) -> Result<u64> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("sensor unavailable");
        }
        if self.fail_history.load(Ordering::SeqCst) {
            bail!("step history query failed");
        }
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(&start.date())
            .copied()
            .unwrap_or(0))
    }

    async fn watch(&self) -> Result<mpsc::Receiver<u64>> {
        let (tx, rx) = mpsc::channel(64);
        *self.live.lock().unwrap() = Some(tx);
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop_watch(&self) {
        self.live.lock().unwrap().take();
    }
}

/// Host that records what it was asked to do instead of scheduling anything.
#[derive(Default)]
pub struct RecordingHost {
    registered: Mutex<BTreeMap<String, DailyTrigger>>,
    presented: Mutex<Vec<Notification>>,
    register_calls: AtomicUsize,
    fail_present: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self) -> BTreeMap<String, DailyTrigger> {
        self.registered.lock().unwrap().clone()
    }

    pub fn presented(&self) -> Vec<Notification> {
        self.presented.lock().unwrap().clone()
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_present(&self, fail: bool) {
        self.fail_present.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationHost for RecordingHost {
    async fn register(&self, identifier: &str, trigger: DailyTrigger) -> Result<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.registered
            .lock()
            .unwrap()
            .insert(identifier.to_string(), trigger);
        Ok(())
    }

    async fn cancel(&self, identifier: &str) -> Result<()> {
        self.registered.lock().unwrap().remove(identifier);
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        self.registered.lock().unwrap().clear();
        Ok(())
    }

    async fn present(&self, notification: &Notification) -> Result<()> {
        if self.fail_present.load(Ordering::SeqCst) {
            bail!("host refused to present");
        }
        self.presented.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingWeather;

#[async_trait]
impl WeatherProvider for FailingWeather {
    async fn current(&self) -> Result<WeatherReport> {
        Err(anyhow!("weather service unreachable"))
    }
}

/// One engine over in-memory fakes. `restart` builds a second engine on the
/// same storage, the way a relaunched process would.
pub struct Harness {
    pub kv: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub sensor: Arc<FakeSensor>,
    pub host: Arc<RecordingHost>,
    pub engine: ActivityEngine,
}

impl Harness {
    pub async fn new(date: NaiveDate, hour: u32, minute: u32) -> Self {
        Self::with_weather(date, hour, minute, Arc::new(StaticWeather::default())).await
    }

    pub async fn with_weather(
        date: NaiveDate,
        hour: u32,
        minute: u32,
        weather: Arc<dyn WeatherProvider>,
    ) -> Self {
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at(date, hour, minute));
        let sensor = Arc::new(FakeSensor::new());
        let host = Arc::new(RecordingHost::new());
        let engine = ActivityEngine::new(
            kv.clone(),
            clock.clone(),
            sensor.clone(),
            host.clone(),
            weather,
        )
        .await;

        Self {
            kv,
            clock,
            sensor,
            host,
            engine,
        }
    }

    pub async fn restart(&self) -> Self {
        let sensor = Arc::new(FakeSensor::new());
        let host = Arc::new(RecordingHost::new());
        let engine = ActivityEngine::new(
            self.kv.clone(),
            self.clock.clone(),
            sensor.clone(),
            host.clone(),
            Arc::new(StaticWeather::default()),
        )
        .await;

        Self {
            kv: self.kv.clone(),
            clock: self.clock.clone(),
            sensor,
            host,
            engine,
        }
    }

    pub fn store(&self) -> &ActivityStore {
        self.engine.store()
    }
}

/// Poll until today's step count reaches `expected` or a second passes.
pub async fn wait_for_steps(store: &ActivityStore, expected: u64) -> u64 {
    let mut steps = 0;
    for _ in 0..200 {
        steps = store.get_current().await.steps;
        if steps == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    steps
}
