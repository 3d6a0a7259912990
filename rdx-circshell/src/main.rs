mod commands;

use anyhow::Result;
use circlock::prelude::*;
use circlock::{ENGINE_NAME, VERSION as LIB_VERSION};
use colored::Colorize;
use commands::{Command, HELP};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", format!("  ( {} )  circular clock shell", ENGINE_NAME).cyan().bold());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(64).dimmed());

    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());
    println!("{}", "-".repeat(64).dimmed());
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &ClockEngine, is_watching_ticks: Arc<AtomicBool>) {
    // Alarm activity is always shown.
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
                    println!("\n<-- {} {} at {}\n>> ", "[ALARM]".red().bold(), title.bold(), time.trim_end());
                }
                AlarmEvent::CallbackFailed { reason, .. } => {
                    println!("\n<-- [ALARM] callback failed: {}\n>> ", reason);
                }
                _ => {}
            }
        }
    });

    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            if let SystemEvent::SyncFailed { reason } = event {
                println!("\n<-- [SYSTEM EVENT] sync failed: {}\n>> ", reason);
            }
        }
    });

    // Tick listener (controlled by the shared flag)
    let mut tick_rx = engine.subscribe_ticks();
    tokio::spawn(async move {
        while let Ok(snapshot) = tick_rx.recv().await {
            if is_watching_ticks.load(Ordering::Relaxed) {
                println!(
                    "<-- [TICK] {:02}:{:02}:{:02} {} {}",
                    snapshot.hour,
                    snapshot.minute,
                    snapshot.second,
                    snapshot.period_marker(),
                    snapshot.weekday_label
                );
            }
        }
    });
}

/// Shell state: the engine plus the handle numbers shown to the user.
struct Shell {
    engine: ClockEngine,
    alarm_handles: HashMap<usize, AlarmId>,
    next_handle: usize,
    is_watching_ticks: Arc<AtomicBool>,
}

impl Shell {
    fn lookup(&self, handle: usize) -> Option<AlarmId> {
        let id = self.alarm_handles.get(&handle).copied();
        if id.is_none() {
            println!("Error: Invalid handle #{}. Use 'alarm list' to see alarms.", handle);
        }
        id
    }

    fn handle_of(&self, id: AlarmId) -> String {
        self.alarm_handles
            .iter()
            .find(|(_, known)| **known == id)
            .map(|(handle, _)| format!("#{}", handle))
            .unwrap_or_else(|| "-".to_string())
    }

    fn print_alarms(&self, alarms: &[Alarm]) {
        if alarms.is_empty() {
            println!("No alarms.");
            return;
        }
        for alarm in alarms {
            let state = if alarm.active { "on ".green() } else { "off".dimmed() };
            println!(
                "  {:>3}  {}  {}  {:<20} {}",
                self.handle_of(alarm.id),
                state,
                alarm.time_display().bold(),
                alarm.title,
                alarm.schedule_display().dimmed()
            );
        }
    }

    /// Runs one command. Returns `false` when the shell should exit.
    async fn execute(&mut self, command: Command) -> bool {
        let engine = &self.engine;
        match command {
            Command::Now => {
                let now = engine.current_time().await;
                println!("{}  {}", engine.format_time().await.cyan().bold(), now.weekday_label);
            }
            Command::Angles => {
                let angles = engine.angles().await;
                println!(
                    "hours {:.1}°  minutes {:.1}°  seconds {:.1}°",
                    angles.hours, angles.minutes, angles.seconds
                );
            }
            Command::Format(format) => {
                engine.set_format(format).await;
                println!("--> {}", engine.format_time().await);
            }
            Command::Set { hour, minute, second } => match engine.set_time(hour, minute, second).await {
                Ok(_) => println!("--> Clock set to {}", engine.format_time().await),
                Err(e) => println!("Error: {}", e),
            },
            Command::Day(day) => match engine.set_weekday(day).await {
                Ok(now) => println!("--> Weekday set to {}", now.weekday_label),
                Err(e) => println!("Error: {}", e),
            },
            Command::Sync => match engine.sync_with_real_time().await {
                Ok(_) => println!("--> Synced: {}", engine.format_time().await),
                Err(e) => println!("Error: {}", e),
            },
            Command::Start => {
                if engine.start().await {
                    println!("--> Clock started.");
                } else {
                    println!("--> Clock is already running.");
                }
            }
            Command::Stop => {
                if engine.stop().await {
                    println!("--> Clock stopped at {}.", engine.format_time().await);
                } else {
                    println!("--> Clock is not running.");
                }
            }
            Command::Watch(on) => {
                self.is_watching_ticks.store(on, Ordering::Relaxed);
                let state = if on { "Started" } else { "Stopped" };
                println!("--> {} printing ticks.", state);
            }
            Command::AlarmAdd(request) => match engine.create_alarm(request).await {
                Ok(id) => {
                    let handle = self.next_handle;
                    self.alarm_handles.insert(handle, id);
                    self.next_handle += 1;
                    println!("--> Added alarm with handle: #{}", handle);
                }
                Err(e) => println!("Error: {}", e),
            },
            Command::AlarmList => {
                let alarms = engine.list_alarms().await;
                self.print_alarms(&alarms);
            }
            Command::AlarmToday => match engine.alarms_for_today().await {
                Ok(alarms) => self.print_alarms(&alarms),
                Err(e) => println!("Error: {}", e),
            },
            Command::AlarmToggle(handle) => {
                if let Some(id) = self.lookup(handle) {
                    match self.engine.toggle_alarm(id).await {
                        Ok(true) => println!("--> Alarm #{} is on.", handle),
                        Ok(false) => println!("--> Alarm #{} is off.", handle),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            Command::AlarmDelete(handle) => {
                if let Some(id) = self.lookup(handle) {
                    match self.engine.delete_alarm(id).await {
                        Ok(alarm) => println!("--> Deleted '{}'.", alarm.title),
                        Err(e) => println!("Error: {}", e),
                    }
                    self.alarm_handles.remove(&handle);
                }
            }
            Command::AlarmDismiss { handle, minutes } => {
                if let Some(id) = self.lookup(handle) {
                    match self.engine.dismiss_alarm(id, minutes).await {
                        Ok(Some(until)) => println!("--> Silenced until {}.", until.format("%H:%M:%S UTC")),
                        Ok(None) => println!("--> Alarm #{} deactivated.", handle),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            Command::AlarmSnooze(handle) => {
                if let Some(id) = self.lookup(handle) {
                    match self.engine.snooze_alarm(id).await {
                        Ok(until) => println!("--> Snoozed until {}.", until.format("%H:%M:%S UTC")),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            Command::Logs => {
                let logs = engine.alarm_logs().await;
                if logs.is_empty() {
                    println!("No alarm activity yet.");
                }
                for entry in logs {
                    println!(
                        "  {}  {:<10} {:<20} {}",
                        entry.at.format("%Y-%m-%d %H:%M:%S"),
                        format!("{:?}", entry.status),
                        entry.alarm_title,
                        entry.user_action.dimmed()
                    );
                }
            }
            Command::Stats => {
                let stats = engine.stats();
                println!("ticks: {}", stats.ticks);
                println!("syncs: {}", stats.sync_operations);
                println!("format changes: {}", stats.format_changes);
                println!("alarms triggered: {}", stats.alarms_triggered);
            }
            Command::Help => {
                println!("Available commands:");
                for (usage, description) in HELP {
                    println!("  {:<28} - {}", usage, description);
                }
            }
            Command::Exit => return false,
            Command::Empty => {}
        }
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = ClockConfig::load(config_path.as_deref())?;
    let engine = ClockEngine::new(config);

    // Create the shared flag for the tick listener.
    let is_watching_ticks = Arc::new(AtomicBool::new(false));
    spawn_event_listeners(&engine, is_watching_ticks.clone());

    info!("Starting {} in the background...", ENGINE_NAME.cyan());
    engine.start_alarm_checking().await;
    engine.start().await;

    let mut shell = Shell {
        engine: engine.clone(),
        alarm_handles: HashMap::new(),
        next_handle: 0,
        is_watching_ticks,
    };

    let mut rl = Editor::new()?;
    rl.set_helper(Some(MyHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                match commands::parse(&line) {
                    Ok(command) => {
                        if !shell.execute(command).await {
                            break;
                        }
                    }
                    Err(message) => println!("{}", message),
                }
            }
            Err(_) => break,
        }
    }

    println!("Exiting circshell...");
    engine.shutdown().await;
    Ok(())
}
