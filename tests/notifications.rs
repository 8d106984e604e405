mod common;

use std::sync::Arc;

use fitfusion_lib::{
    activity::ActivityField,
    db::KeyValueStore,
    notifications::{
        DailyTrigger, FireOutcome, NotificationKind, NotificationState, LEDGER_STORAGE_KEY,
    },
    settings::{ReminderSlot, ScheduleConfig},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{at, day, FailingWeather, Harness};

use NotificationKind::*;

fn dispatched(outcome: &FireOutcome) -> bool {
    matches!(outcome, FireOutcome::Dispatched(_))
}

#[tokio::test]
async fn repeated_fires_dispatch_once_per_day() {
    let today = day(2024, 6, 10);
    let h = Harness::new(today, 7, 0).await;
    let engine = h.engine.notifications();
    engine.schedule(WaterReminder, 7, 0).await.unwrap();

    let first = engine.on_trigger_fired(WaterReminder).await.unwrap();
    let second = engine.on_trigger_fired(WaterReminder).await.unwrap();

    assert!(dispatched(&first));
    assert_eq!(second, FireOutcome::Suppressed);
    assert_eq!(h.host.presented().len(), 1);
    assert_eq!(engine.ledger().last_sent(WaterReminder).await.unwrap(), Some(today));
}

#[tokio::test]
async fn relaunch_on_the_same_day_stays_suppressed() {
    let today = day(2024, 6, 10);
    let h = Harness::new(today, 7, 0).await;
    h.engine.notifications().on_trigger_fired(WaterReminder).await.unwrap();

    let relaunched = h.restart().await;
    let outcome = relaunched
        .engine
        .notifications()
        .on_trigger_fired_id("water-reminder")
        .await
        .unwrap();

    assert_eq!(outcome, FireOutcome::Suppressed);
    assert!(relaunched.host.presented().is_empty());

    h.clock.set(at(day(2024, 6, 11), 7, 0));
    let next_day = relaunched
        .engine
        .notifications()
        .on_trigger_fired(WaterReminder)
        .await
        .unwrap();
    assert!(dispatched(&next_day));
}

#[tokio::test]
async fn simultaneous_fires_dispatch_once() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    let outcomes = tokio::join!(
        engine.on_trigger_fired(EveningWater),
        engine.on_trigger_fired(EveningWater),
        engine.on_trigger_fired(EveningWater),
        engine.on_trigger_fired(EveningWater),
    );
    let outcomes = [outcomes.0, outcomes.1, outcomes.2, outcomes.3];

    let sent = outcomes
        .iter()
        .filter(|outcome| dispatched(outcome.as_ref().unwrap()))
        .count();
    assert_eq!(sent, 1);
    assert_eq!(h.host.presented().len(), 1);
}

#[tokio::test]
async fn kinds_are_deduplicated_independently() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    assert!(dispatched(&engine.on_trigger_fired(WaterReminder).await.unwrap()));
    assert!(dispatched(&engine.on_trigger_fired(MiddayWater).await.unwrap()));
    assert!(dispatched(&engine.on_trigger_fired(MealSuggestion).await.unwrap()));

    let kinds: Vec<_> = h.host.presented().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![WaterReminder, MiddayWater, MealSuggestion]);
}

#[tokio::test]
async fn send_now_ignores_the_ledger() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    engine.send_now(LunchReminder).await.unwrap();
    engine.send_now(LunchReminder).await.unwrap();

    assert_eq!(h.host.presented().len(), 2);
    assert_eq!(engine.ledger().last_sent(LunchReminder).await.unwrap(), None);
    assert!(dispatched(&engine.on_trigger_fired(LunchReminder).await.unwrap()));
}

#[tokio::test]
async fn rescheduling_replaces_the_trigger() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    engine.schedule(WaterReminder, 7, 0).await.unwrap();
    engine.schedule(WaterReminder, 8, 15).await.unwrap();

    let registered = h.host.registered();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered["water-reminder"], DailyTrigger::daily(8, 15));
    assert!(registered["water-reminder"].repeats);
    assert_eq!(engine.scheduled().await[&WaterReminder], DailyTrigger::daily(8, 15));
}

#[tokio::test]
async fn invalid_times_are_rejected_before_reaching_the_host() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    assert!(engine.schedule(WaterReminder, 24, 0).await.is_err());
    assert!(engine.schedule(WaterReminder, 7, 60).await.is_err());
    assert_eq!(h.host.register_calls(), 0);
    assert_eq!(engine.state(WaterReminder).await, NotificationState::Unscheduled);
}

#[tokio::test]
async fn cancel_all_keeps_the_ledger() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();
    assert_eq!(engine.schedule_all().await.unwrap(), NotificationKind::ALL.len());
    engine.on_trigger_fired(WaterReminder).await.unwrap();

    engine.cancel_all().await.unwrap();

    assert!(h.host.registered().is_empty());
    assert!(engine.scheduled().await.is_empty());
    assert_eq!(engine.state(WaterReminder).await, NotificationState::Unscheduled);

    engine.schedule(WaterReminder, 7, 0).await.unwrap();
    assert_eq!(engine.state(WaterReminder).await, NotificationState::DispatchedToday);
    assert_eq!(
        engine.on_trigger_fired(WaterReminder).await.unwrap(),
        FireOutcome::Suppressed
    );
}

#[tokio::test]
async fn state_resets_on_the_next_day() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    assert_eq!(engine.state(DinnerReminder).await, NotificationState::Unscheduled);
    engine.schedule(DinnerReminder, 19, 0).await.unwrap();
    assert_eq!(engine.state(DinnerReminder).await, NotificationState::Scheduled);

    engine.on_trigger_fired(DinnerReminder).await.unwrap();
    assert_eq!(engine.state(DinnerReminder).await, NotificationState::DispatchedToday);

    h.clock.set(at(day(2024, 6, 11), 6, 0));
    assert_eq!(engine.state(DinnerReminder).await, NotificationState::Scheduled);
}

#[tokio::test]
async fn schedule_all_follows_group_and_master_toggles() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    let config = ScheduleConfig {
        meal_reminders_enabled: false,
        ..ScheduleConfig::default()
    }
    .with_slot(EveningWater, ReminderSlot { enabled: false, hour: 21, minute: 0 })
    .with_slot(WaterReminder, ReminderSlot::at(6, 45));

    assert_eq!(engine.update_config(config).await.unwrap(), 3);
    let registered: Vec<String> = h.host.registered().into_keys().collect();
    assert_eq!(registered, vec!["midday-water", "morning-motivation", "water-reminder"]);
    assert_eq!(h.host.registered()["water-reminder"], DailyTrigger::daily(6, 45));

    let off = ScheduleConfig {
        enabled: false,
        ..engine.config()
    };
    assert_eq!(engine.update_config(off).await.unwrap(), 0);
    assert!(h.host.registered().is_empty());
}

#[tokio::test]
async fn config_survives_relaunch_and_rejects_bad_times() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();
    let config = ScheduleConfig {
        motivation_enabled: false,
        ..ScheduleConfig::default()
    };
    engine.update_config(config.clone()).await.unwrap();

    let bad = config.clone().with_slot(LunchReminder, ReminderSlot::at(12, 75));
    assert!(engine.update_config(bad).await.is_err());
    assert_eq!(engine.config(), config);

    let relaunched = h.restart().await;
    assert_eq!(relaunched.engine.notifications().config(), config);
}

#[tokio::test]
async fn disabled_kinds_are_not_dispatched() {
    let h = Harness::new(day(2024, 6, 10), 6, 30).await;
    let engine = h.engine.notifications();
    engine
        .update_config(ScheduleConfig {
            motivation_enabled: false,
            ..ScheduleConfig::default()
        })
        .await
        .unwrap();

    let outcome = engine.on_trigger_fired(MorningMotivation).await.unwrap();

    assert_eq!(outcome, FireOutcome::Disabled);
    assert!(h.host.presented().is_empty());
    assert_eq!(engine.ledger().last_sent(MorningMotivation).await.unwrap(), None);
}

#[tokio::test]
async fn weather_failure_falls_back_to_static_meal_text() {
    let h = Harness::with_weather(day(2024, 6, 10), 12, 30, Arc::new(FailingWeather)).await;

    let outcome = h.engine.notifications().on_trigger_fired(LunchReminder).await.unwrap();

    let notification = match outcome {
        FireOutcome::Dispatched(notification) => notification,
        other => panic!("expected a dispatch, got {other:?}"),
    };
    assert_eq!(notification.title, "Meal Reminder");
    assert!(!notification.body.is_empty());
}

#[tokio::test]
async fn meal_content_uses_the_weather_catalogue() {
    let h = Harness::new(day(2024, 6, 10), 7, 30).await;

    let notification = h.engine.notifications().send_now(MealSuggestion).await.unwrap();

    assert_eq!(notification.title, "Breakfast Suggestion");
    assert_eq!(notification.data["type"], "meal-suggestion");
    assert_eq!(notification.created_at, at(day(2024, 6, 10), 7, 30));
}

#[tokio::test]
async fn water_content_reads_todays_hydration() {
    let h = Harness::new(day(2024, 6, 10), 14, 0).await;
    h.store()
        .increment(ActivityField::HydrationGlasses, 3)
        .await
        .unwrap();

    let notification = h.engine.notifications().send_now(MiddayWater).await.unwrap();

    assert!(notification.body.contains("3 of 12 glasses"));
}

#[tokio::test]
async fn failed_presentation_is_not_recorded() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();

    h.host.set_fail_present(true);
    assert!(engine.on_trigger_fired(WaterReminder).await.is_err());
    assert_eq!(engine.ledger().last_sent(WaterReminder).await.unwrap(), None);

    h.host.set_fail_present(false);
    assert!(dispatched(&engine.on_trigger_fired(WaterReminder).await.unwrap()));
}

#[tokio::test]
async fn unreadable_ledger_counts_as_not_sent() {
    let today = day(2024, 6, 10);
    let h = Harness::new(today, 7, 0).await;
    h.kv.set(LEDGER_STORAGE_KEY, "not json".into()).await.unwrap();

    let outcome = h.engine.notifications().on_trigger_fired(WaterReminder).await.unwrap();

    assert!(dispatched(&outcome));
    assert_eq!(
        h.engine.notifications().ledger().last_sent(WaterReminder).await.unwrap(),
        Some(today)
    );
}

#[tokio::test]
async fn dispatcher_drains_fired_identifiers() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications().clone();
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let cancel_token = CancellationToken::new();

    let dispatcher = {
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move { engine.run(fired_rx, cancel_token).await })
    };

    fired_tx.send("water-reminder".to_string()).unwrap();
    fired_tx.send("water-reminder".to_string()).unwrap();
    fired_tx.send("no-such-kind".to_string()).unwrap();
    fired_tx.send("dinner-reminder".to_string()).unwrap();
    drop(fired_tx);
    dispatcher.await.unwrap();

    let kinds: Vec<_> = h.host.presented().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![WaterReminder, DinnerReminder]);
    assert!(!cancel_token.is_cancelled());
}

#[tokio::test]
async fn failed_ledger_write_still_dispatches_once() {
    let h = Harness::new(day(2024, 6, 10), 7, 0).await;
    let engine = h.engine.notifications();
    h.store().get_current().await;
    h.kv.set_fail_writes(true);

    let first = engine.on_trigger_fired(WaterReminder).await.unwrap();
    let second = engine.on_trigger_fired(WaterReminder).await.unwrap();

    assert!(dispatched(&first));
    assert_eq!(second, FireOutcome::Suppressed);
    assert_eq!(h.host.presented().len(), 1);
    assert_eq!(engine.ledger().last_sent(WaterReminder).await.unwrap(), None);

    engine.schedule(WaterReminder, 7, 0).await.unwrap();
    assert_eq!(engine.state(WaterReminder).await, NotificationState::DispatchedToday);
}
