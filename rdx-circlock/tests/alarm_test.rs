use chrono::{Duration as ChronoDuration, NaiveDate};
use circlock::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// An engine whose time source reads Monday 2026-10-19 at 06:00:00 Bogota.
fn engine() -> ClockEngine {
    let source = FixedTimeSource::at(chrono_tz::America::Bogota, monday(), 6, 0, 0).unwrap();
    ClockEngine::with_time_source(ClockConfig::default(), Arc::new(source))
}

async fn check_at(engine: &ClockEngine, hour24: u8, minute: u8, second: u8) -> Vec<AlarmId> {
    engine.set_time(hour24, minute, second).await.unwrap();
    engine.check_alarms().await
}

#[tokio::test]
async fn half_past_six_end_to_end() {
    let engine = engine();
    let id = engine
        .create_alarm(NewAlarm::new(6, 30, Period::AM).titled("Wake up"))
        .await
        .unwrap();

    for weekday in [0, 3, 6] {
        engine.set_weekday(weekday).await.unwrap();
        // Fresh day for each weekday under test.
        check_at(&engine, 0, 0, 0).await;
        assert_eq!(check_at(&engine, 6, 30, 0).await, vec![id]);
    }

    assert!(check_at(&engine, 6, 30, 1).await.is_empty());
    // The same second again: already triggered today.
    assert!(check_at(&engine, 6, 30, 0).await.is_empty());

    let alarm = engine.alarm(id).await.unwrap();
    assert_eq!(alarm.times_triggered, 3);
    assert!(alarm.triggered_today);
    assert_eq!(engine.stats().alarms_triggered, 3);
}

#[tokio::test]
async fn pm_alarm_matches_canonical_hour() {
    let engine = engine();
    let id = engine.create_alarm(NewAlarm::new(6, 30, Period::PM)).await.unwrap();
    assert!(check_at(&engine, 6, 30, 0).await.is_empty());
    assert_eq!(check_at(&engine, 18, 30, 0).await, vec![id]);
}

#[tokio::test]
async fn match_is_independent_of_display_format() {
    let engine = engine();
    let id = engine.create_alarm(NewAlarm::new(12, 0, Period::PM)).await.unwrap();
    engine.set_format(HourFormat::TwentyFourHour).await;
    assert_eq!(check_at(&engine, 12, 0, 0).await, vec![id]);
}

#[tokio::test]
async fn daily_flag_resets_only_at_midnight() {
    let engine = engine();
    let id = engine.create_alarm(NewAlarm::new(6, 30, Period::AM)).await.unwrap();
    check_at(&engine, 6, 30, 0).await;

    check_at(&engine, 23, 59, 59).await;
    assert!(engine.alarm(id).await.unwrap().triggered_today);

    // Let the cascade carry into midnight, then check.
    engine.tick().await;
    assert_eq!(engine.format_24h().await, "00:00:00");
    engine.check_alarms().await;
    assert!(!engine.alarm(id).await.unwrap().triggered_today);
}

#[tokio::test]
async fn skipped_second_is_a_missed_alarm() {
    // Polling limitation: if the checker never observes 06:30:00 the alarm
    // does not ring late.
    let engine = engine();
    engine.create_alarm(NewAlarm::new(6, 30, Period::AM)).await.unwrap();
    assert!(check_at(&engine, 6, 29, 59).await.is_empty());
    assert!(check_at(&engine, 6, 30, 1).await.is_empty());
}

#[tokio::test]
async fn weekday_and_date_restrictions() {
    let engine = engine();
    let thursday = engine
        .create_alarm(NewAlarm::new(7, 0, Period::AM).on_weekday(3))
        .await
        .unwrap();
    let today_only = engine
        .create_alarm(NewAlarm::new(7, 0, Period::AM).on_date(monday()))
        .await
        .unwrap();
    let later = engine
        .create_alarm(NewAlarm::new(7, 0, Period::AM).on_date(monday() + ChronoDuration::days(1)))
        .await
        .unwrap();

    // The source's calendar date is Monday 2026-10-19.
    engine.set_weekday(0).await.unwrap();
    assert_eq!(check_at(&engine, 7, 0, 0).await, vec![today_only]);

    engine.set_weekday(3).await.unwrap();
    check_at(&engine, 0, 0, 0).await;
    let fired = check_at(&engine, 7, 0, 0).await;
    assert!(fired.contains(&thursday));
    assert!(!fired.contains(&later));

    let today: Vec<AlarmId> = engine
        .alarms_for_today()
        .await
        .unwrap()
        .into_iter()
        .map(|alarm| alarm.id)
        .collect();
    assert_eq!(today, vec![today_only]);
}

#[tokio::test]
async fn create_rejects_bad_requests() {
    let engine = engine();
    assert!(matches!(
        engine.create_alarm(NewAlarm::new(0, 0, Period::AM)).await,
        Err(ClockError::OutOfRange { field: "hour", .. })
    ));
    assert_eq!(
        engine
            .create_alarm(NewAlarm::new(7, 0, Period::AM).on_weekday(9))
            .await,
        Err(ClockError::InvalidWeekday(9))
    );
    let yesterday = monday().pred_opt().unwrap();
    assert_eq!(
        engine
            .create_alarm(NewAlarm::new(7, 0, Period::AM).on_date(yesterday))
            .await,
        Err(ClockError::PastDate(yesterday))
    );
    assert!(engine.list_alarms().await.is_empty());
}

#[tokio::test]
async fn silenced_alarm_never_matches_while_silenced() {
    // The fixed source never advances, so the silence window never elapses.
    let engine = engine();
    let id = engine
        .create_alarm(NewAlarm::new(6, 30, Period::AM).repeating_daily())
        .await
        .unwrap();
    let until = engine.dismiss_alarm(id, 10).await.unwrap();
    assert!(until.is_some());
    assert!(check_at(&engine, 6, 30, 0).await.is_empty());

    // Once the window has passed, it rings normally.
    let snapshot = engine.set_time(6, 30, 0).await.unwrap();
    let after = until.unwrap() + ChronoDuration::seconds(1);
    assert_eq!(engine.check_alarms_at(&snapshot, monday(), after).await, vec![id]);
}

#[tokio::test]
async fn dismiss_without_silence_deactivates() {
    let engine = engine();
    let id = engine.create_alarm(NewAlarm::new(6, 30, Period::AM)).await.unwrap();
    assert_eq!(engine.dismiss_alarm(id, 0).await, Ok(None));
    assert!(!engine.alarm(id).await.unwrap().active);
    assert!(check_at(&engine, 6, 30, 0).await.is_empty());
    assert_eq!(engine.toggle_alarm(id).await, Ok(true));
    assert_eq!(check_at(&engine, 6, 30, 0).await, vec![id]);

    engine.set_alarm_active(id, false).await.unwrap();
    assert!(!engine.alarm(id).await.unwrap().active);
}

#[tokio::test]
async fn snooze_then_limit() {
    let engine = engine();
    let id = engine.create_alarm(NewAlarm::new(6, 30, Period::AM)).await.unwrap();
    for _ in 0..3 {
        engine.snooze_alarm(id).await.unwrap();
    }
    assert_eq!(
        engine.snooze_alarm(id).await,
        Err(ClockError::SnoozeLimitReached { max: 3 })
    );
}

#[tokio::test]
async fn deleted_alarm_leaves_titled_history() {
    let engine = engine();
    let id = engine
        .create_alarm(NewAlarm::new(6, 30, Period::AM).titled("Meds"))
        .await
        .unwrap();
    check_at(&engine, 6, 30, 0).await;
    engine.dismiss_alarm(id, 5).await.unwrap();
    let mut events = engine.subscribe_alarm_events();

    engine.delete_alarm(id).await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), AlarmEvent::Deleted { .. }));
    assert_eq!(engine.delete_alarm(id).await, Err(ClockError::AlarmNotFound(id)));

    let logs = engine.alarm_logs().await;
    let statuses: Vec<LogStatus> = logs.iter().map(|entry| entry.status).collect();
    assert_eq!(statuses, [LogStatus::Triggered, LogStatus::Dismissed]);
    assert!(logs.iter().all(|entry| entry.alarm.is_none() && entry.alarm_title == "Meds"));
}

#[tokio::test]
async fn callbacks_and_events_on_trigger() {
    let engine = engine();
    let mut events = engine.subscribe_alarm_events();
    let id = engine.create_alarm(NewAlarm::new(6, 30, Period::AM)).await.unwrap();
    let rung = Arc::new(AtomicU32::new(0));
    let counter = rung.clone();
    engine
        .set_alarm_callback(id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

    check_at(&engine, 6, 30, 0).await;
    assert_eq!(rung.load(Ordering::SeqCst), 1);
    assert!(matches!(events.recv().await.unwrap(), AlarmEvent::Created { .. }));
    match events.recv().await.unwrap() {
        AlarmEvent::Triggered { id: fired, snapshot, .. } => {
            assert_eq!(fired, id);
            assert_eq!(snapshot.hour24, 6);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn running_clock_checks_every_second_once() {
    let engine = engine();
    let mut events = engine.subscribe_alarm_events();
    let mut repeating = Vec::new();
    for second in 1..=5 {
        let id = engine
            .create_alarm(NewAlarm::new(6, 0, Period::AM).at_second(second).repeating_daily())
            .await
            .unwrap();
        repeating.push(id);
    }
    let once = engine
        .create_alarm(NewAlarm::new(6, 0, Period::AM).at_second(3))
        .await
        .unwrap();

    assert!(engine.start_alarm_checking().await);
    assert!(engine.start().await);
    tokio::time::sleep(Duration::from_millis(5500)).await;
    engine.shutdown().await;

    let mut fired = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let AlarmEvent::Triggered { id, snapshot, .. } = event {
            fired.push((id, snapshot.second));
        }
    }
    let mut expected: Vec<(AlarmId, u8)> = repeating.iter().copied().zip(1..=5).collect();
    expected.insert(3, (once, 3));
    assert_eq!(fired.len(), expected.len());
    for (id, second) in expected {
        assert_eq!(
            fired.iter().filter(|fire| **fire == (id, second)).count(),
            1,
            "second {second}"
        );
    }
    assert_eq!(engine.stats().ticks, 5);
    assert_eq!(engine.stats().alarms_triggered, 6);
}

#[tokio::test(start_paused = true)]
async fn running_clock_resets_at_midnight() {
    let engine = engine();
    let late = engine
        .create_alarm(NewAlarm::new(11, 59, Period::PM).at_second(59))
        .await
        .unwrap();
    let midnight = engine
        .create_alarm(NewAlarm::new(12, 0, Period::AM))
        .await
        .unwrap();
    engine.set_time(23, 59, 58).await.unwrap();

    engine.start_alarm_checking().await;
    engine.start().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(engine.alarm(late).await.unwrap().triggered_today);

    tokio::time::sleep(Duration::from_secs(1)).await;
    engine.shutdown().await;

    let now = engine.current_time().await;
    assert_eq!((now.hour24, now.minute, now.second), (0, 0, 0));
    assert_eq!(now.weekday_label, "Tuesday");

    let late = engine.alarm(late).await.unwrap();
    assert!(!late.triggered_today);
    assert_eq!(late.times_triggered, 1);
    let midnight = engine.alarm(midnight).await.unwrap();
    assert!(midnight.triggered_today);
    assert_eq!(midnight.times_triggered, 1);
}

#[tokio::test(start_paused = true)]
async fn checking_follows_manual_ticks() {
    let engine = engine();
    let id = engine
        .create_alarm(NewAlarm::new(6, 0, Period::AM).at_second(1).repeating_daily())
        .await
        .unwrap();
    engine.start_alarm_checking().await;
    engine.tick().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(engine.alarm(id).await.unwrap().times_triggered, 1);

    // With checking switched off, ticks are no longer matched.
    assert!(engine.stop_alarm_checking().await);
    engine.set_time(6, 0, 0).await.unwrap();
    engine.tick().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(engine.alarm(id).await.unwrap().times_triggered, 1);
}
