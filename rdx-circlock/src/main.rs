use anyhow::Result;
use circlock::prelude::*;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load configuration from the optional file named on the command line.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ClockConfig::load(config_path.as_deref())?;
    info!(timezone = %config.timezone, format = ?config.format, "Configuration loaded");

    // 3. Create the ClockEngine instance.
    let engine = ClockEngine::new(config);
    info!("Clock reads {}", engine.format_time().await.cyan());

    // 4. Spawn concurrent tasks to listen to different event streams.
    spawn_event_listeners(&engine);

    // 5. Register an observer and a demo alarm a few seconds ahead.
    register_demo_components(&engine).await?;

    // 6. Run the engine.
    engine.run().await?;

    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &ClockEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut alarm_rx = engine.subscribe_alarm_events();
    tokio::spawn(async move {
        while let Ok(event) = alarm_rx.recv().await {
            match event {
                AlarmEvent::Triggered { title, snapshot, .. } => {
                    let time = format!(
                        "{:02}:{:02}:{:02} {}",
                        snapshot.hour,
                        snapshot.minute,
                        snapshot.second,
                        snapshot.period_marker()
                    );
                    info!("{} {} - {}", "[ALARM]".red().bold(), title.bold(), time.trim_end());
                }
                other => info!("[ALARM] => {:?}", other),
            }
        }
    });
}

/// Registers a tick observer and an alarm five seconds from now.
async fn register_demo_components(engine: &ClockEngine) -> Result<()> {
    let _observer_id = engine
        .on_tick(|snapshot| {
            if snapshot.second == 0 {
                info!(
                    "[CLOCK] {:02}:{:02} {} ({})",
                    snapshot.hour,
                    snapshot.minute,
                    snapshot.period_marker(),
                    snapshot.weekday_label
                );
            }
            Ok(())
        })
        .await;

    let now = engine.current_time().await;
    let total = u32::from(now.hour24) * 3600 + u32::from(now.minute) * 60 + u32::from(now.second) + 5;
    let hour24 = ((total / 3600) % 24) as u8;
    let minute = ((total / 60) % 60) as u8;
    let second = (total % 60) as u8;
    let dial_hour = circlock::rings::to_12h(hour24);
    let period = Period::of_hour24(hour24);

    let alarm_id = engine
        .create_alarm(
            NewAlarm::new(dial_hour, minute, period)
                .at_second(second)
                .titled("Demo alarm"),
        )
        .await?;
    engine
        .set_alarm_callback(alarm_id, |alarm| {
            info!("Callback ran for '{}' at {}", alarm.title, alarm.time_display());
            Ok(())
        })
        .await?;
    Ok(())
}
