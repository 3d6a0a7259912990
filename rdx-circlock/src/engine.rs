//! The engine handle that owns the clock, its alarms, and their background loops.

use crate::alarm::{Alarm, AlarmContext, AlarmLog, NewAlarm};
use crate::clock::{Carry, ClockState};
use crate::common::{run_isolated, AlarmId, CallbackOutcome, ObserverId};
use crate::config::ClockConfig;
use crate::error::ClockError;
use crate::events::{AlarmEvent, HandAngles, HourFormat, SystemEvent, TimeSnapshot};
use crate::registry::{AlarmCallback, AlarmRegistry, FiredAlarm};
use crate::time::{TimeSource, WallTime, ZonedTimeSource};
use crate::worker::Worker;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use slotmap::SlotMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

/// A function notified with the clock's reading after every tick.
pub type Observer = Box<dyn FnMut(&TimeSnapshot) -> anyhow::Result<()> + Send + Sync>;

/// Running totals kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockStats {
    pub ticks: u64,
    pub sync_operations: u64,
    pub format_changes: u64,
    pub alarms_triggered: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    sync_operations: AtomicU64,
    format_changes: AtomicU64,
    alarms_triggered: AtomicU64,
}

/// The clock engine.
///
/// This struct is the single source of truth for "what time the clock shows".
/// It is cheap to clone; every clone is a handle to the same clock, so the
/// hosting process creates one and passes it to whatever needs it.
///
/// All ring mutation and every read go through one lock, so a reader never
/// sees a half-applied cascade (seconds reset but minutes not yet advanced).
///
/// The background loops only hold a weak reference. When the last handle is
/// dropped both loops are cancelled, even without `shutdown()`.
#[derive(Clone)]
pub struct ClockEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: ClockConfig,
    source: Arc<dyn TimeSource>,
    state: RwLock<ClockState>,
    alarms: RwLock<AlarmRegistry>,
    observers: RwLock<SlotMap<ObserverId, Observer>>,
    counters: Counters,

    // --- Senders for each public event category ---
    tick_sender: broadcast::Sender<TimeSnapshot>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    alarm_event_sender: broadcast::Sender<AlarmEvent>,

    // --- Background loops, aborted when dropped ---
    ticker: Mutex<Worker>,
    alarm_checker: Mutex<Worker>,
}

// Core implementation block for internal logic.
impl ClockEngine {
    /// Creates an engine reading real time in the configured zone.
    pub fn new(config: ClockConfig) -> Self {
        let source = ZonedTimeSource::new(config.timezone);
        Self::with_time_source(config, Arc::new(source))
    }

    /// Creates an engine reading real time from `source`.
    ///
    /// With `auto_sync` set the clock is aligned with the source right away;
    /// if the source fails the clock starts at 00:00:00 Monday instead.
    pub fn with_time_source(config: ClockConfig, source: Arc<dyn TimeSource>) -> Self {
        let capacity = config.channel_capacity.max(1);
        let (tick_sender, _) = broadcast::channel(capacity);
        let (system_event_sender, _) = broadcast::channel(capacity);
        let (alarm_event_sender, _) = broadcast::channel(capacity);

        let mut state = ClockState::new(config.format);
        let counters = Counters::default();
        if config.auto_sync {
            match source.now().and_then(|now| state.sync_with_real_time(&now)) {
                Ok(()) => {
                    counters.sync_operations.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => warn!(error = %e, "Initial sync failed; starting from midnight"),
            }
        }

        let inner = EngineInner {
            config,
            source,
            state: RwLock::new(state),
            alarms: RwLock::new(AlarmRegistry::new()),
            observers: RwLock::new(SlotMap::with_key()),
            counters,
            tick_sender,
            system_event_sender,
            alarm_event_sender,
            ticker: Mutex::new(Worker::new("ticker")),
            alarm_checker: Mutex::new(Worker::new("alarm-checker")),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Runs the clock and the alarm checker until Ctrl+C, then shuts down.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("ClockEngine starting up...");
        self.start_alarm_checking().await;
        self.start().await;
        info!(
            timezone = %self.inner.config.timezone,
            "Clock running. Press Ctrl+C to shut down."
        );
        tokio::signal::ctrl_c().await?;

        info!("Shutdown signal received. Stopping background loops...");
        self.shutdown().await;
        info!("ClockEngine has shut down.");
        Ok(())
    }

    #[doc(hidden)]
    fn downgrade(&self) -> Weak<EngineInner> {
        Arc::downgrade(&self.inner)
    }

    #[doc(hidden)]
    fn upgrade(weak: &Weak<EngineInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[doc(hidden)]
    async fn notify_observers(&self, snapshot: &TimeSnapshot) {
        let mut observers = self.inner.observers.write().await;
        for (id, observer) in observers.iter_mut() {
            let reason = match run_isolated(|| (observer)(snapshot)) {
                CallbackOutcome::Completed => continue,
                CallbackOutcome::Failed(reason) => {
                    warn!(observer = ?id, error = %reason, "Observer returned an error");
                    reason
                }
                CallbackOutcome::Panicked(reason) => {
                    error!(observer = ?id, panic = %reason, "Observer panicked");
                    reason
                }
            };
            self.inner
                .system_event_sender
                .send(SystemEvent::ObserverFailed { id, reason })
                .ok();
        }
    }

    #[doc(hidden)]
    fn publish_fired(&self, fired: Vec<FiredAlarm>, snapshot: &TimeSnapshot) {
        self.inner
            .counters
            .alarms_triggered
            .fetch_add(fired.len() as u64, Ordering::Relaxed);
        for alarm in fired {
            if let Some(reason) = alarm.callback_error {
                self.inner
                    .alarm_event_sender
                    .send(AlarmEvent::CallbackFailed {
                        id: alarm.id,
                        reason,
                    })
                    .ok();
            }
            self.inner
                .alarm_event_sender
                .send(AlarmEvent::Triggered {
                    id: alarm.id,
                    title: alarm.title,
                    snapshot: snapshot.clone(),
                })
                .ok();
        }
    }

    #[doc(hidden)]
    fn read_source(&self) -> Result<WallTime, ClockError> {
        self.inner.source.now()
    }
}

// Clock API: lifecycle, time reads and writes.
impl ClockEngine {
    /// Starts the one-second ticker. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let weak = self.downgrade();
        let started = self
            .inner
            .ticker
            .lock()
            .await
            .start_periodic(self.inner.config.tick_interval(), move || {
                let engine = ClockEngine::upgrade(&weak);
                async move {
                    if let Some(engine) = engine {
                        engine.tick().await;
                    }
                }
            });
        if started {
            info!("Clock ticker started");
            self.inner
                .system_event_sender
                .send(SystemEvent::EngineStarted {
                    timestamp: tokio::time::Instant::now(),
                })
                .ok();
        }
        started
    }

    /// Stops the ticker and waits (bounded) for it to exit.
    ///
    /// Safe to call when already stopped. Returns `false` in that case.
    pub async fn stop(&self) -> bool {
        let stopped = self
            .inner
            .ticker
            .lock()
            .await
            .stop(self.inner.config.stop_timeout())
            .await;
        if stopped {
            info!("Clock ticker stopped");
            self.inner
                .system_event_sender
                .send(SystemEvent::EngineStopped)
                .ok();
        }
        stopped
    }

    pub async fn is_running(&self) -> bool {
        self.inner.ticker.lock().await.is_running()
    }

    /// Stops both background loops.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.stop_alarm_checking().await;
    }

    /// Advances the clock one second and notifies observers and tick
    /// subscribers. This is what the ticker runs every period.
    pub async fn tick(&self) -> TimeSnapshot {
        let (carry, snapshot) = {
            let mut state = self.inner.state.write().await;
            let carry = state.advance_second();
            (carry, state.current_time())
        };
        self.inner.counters.ticks.fetch_add(1, Ordering::Relaxed);
        trace!(
            hour = snapshot.hour24,
            minute = snapshot.minute,
            second = snapshot.second,
            "Tick"
        );
        if carry == Carry::Day {
            info!(weekday = snapshot.weekday_label, "New day");
        }

        self.notify_observers(&snapshot).await;
        self.inner.tick_sender.send(snapshot.clone()).ok();
        snapshot
    }

    /// Aligns the clock with the engine's time source.
    ///
    /// If the source cannot be read the clock keeps its current time and the
    /// error is returned for the caller to surface or ignore.
    pub async fn sync_with_real_time(&self) -> Result<TimeSnapshot, ClockError> {
        match self.read_source() {
            Ok(now) => self.sync_to(&now).await,
            Err(e) => {
                warn!(error = %e, "Sync failed; keeping current time");
                self.inner
                    .system_event_sender
                    .send(SystemEvent::SyncFailed {
                        reason: e.to_string(),
                    })
                    .ok();
                Err(e)
            }
        }
    }

    /// Aligns the clock with an explicit reading.
    pub async fn sync_to(&self, now: &WallTime) -> Result<TimeSnapshot, ClockError> {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            state.sync_with_real_time(now)?;
            state.current_time()
        };
        self.inner
            .counters
            .sync_operations
            .fetch_add(1, Ordering::Relaxed);
        info!(time = %format_args!("{:02}:{:02}:{:02}", now.hour, now.minute, now.second), "Clock synced");
        self.inner
            .system_event_sender
            .send(SystemEvent::Synced {
                snapshot: snapshot.clone(),
            })
            .ok();
        Ok(snapshot)
    }

    pub async fn set_format(&self, format: HourFormat) {
        let changed = {
            let mut state = self.inner.state.write().await;
            let changed = state.format() != format;
            state.set_format(format);
            changed
        };
        if changed {
            self.inner
                .counters
                .format_changes
                .fetch_add(1, Ordering::Relaxed);
            info!(?format, "Display format changed");
            self.inner
                .system_event_sender
                .send(SystemEvent::FormatChanged { format })
                .ok();
        }
    }

    pub async fn format(&self) -> HourFormat {
        self.inner.state.read().await.format()
    }

    /// Sets the time by hand, bypassing the cascade.
    pub async fn set_time(
        &self,
        hour24: u8,
        minute: u8,
        second: u8,
    ) -> Result<TimeSnapshot, ClockError> {
        let snapshot = {
            let mut state = self.inner.state.write().await;
            state.set_time(hour24, minute, second)?;
            state.current_time()
        };
        info!(hour = hour24, minute, second, "Time set manually");
        self.inner
            .system_event_sender
            .send(SystemEvent::TimeSet {
                snapshot: snapshot.clone(),
            })
            .ok();
        Ok(snapshot)
    }

    /// Sets the weekday (0=Monday..6=Sunday).
    pub async fn set_weekday(&self, index: u8) -> Result<TimeSnapshot, ClockError> {
        let mut state = self.inner.state.write().await;
        state.set_weekday(index)?;
        Ok(state.current_time())
    }

    pub async fn current_time(&self) -> TimeSnapshot {
        self.inner.state.read().await.current_time()
    }

    pub async fn angles(&self) -> HandAngles {
        self.inner.state.read().await.angles()
    }

    /// The time string in the active format.
    pub async fn format_time(&self) -> String {
        self.inner.state.read().await.format_time()
    }

    pub async fn format_12h(&self) -> String {
        self.inner.state.read().await.format_12h()
    }

    pub async fn format_24h(&self) -> String {
        self.inner.state.read().await.format_24h()
    }

    pub fn stats(&self) -> ClockStats {
        let counters = &self.inner.counters;
        ClockStats {
            ticks: counters.ticks.load(Ordering::Relaxed),
            sync_operations: counters.sync_operations.load(Ordering::Relaxed),
            format_changes: counters.format_changes.load(Ordering::Relaxed),
            alarms_triggered: counters.alarms_triggered.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.inner.config
    }

    /// Registers a callback run with the clock's reading after every tick.
    ///
    /// A callback that errors or panics is logged and reported as
    /// `SystemEvent::ObserverFailed`; the remaining observers still run.
    pub async fn on_tick(
        &self,
        observer: impl FnMut(&TimeSnapshot) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ObserverId {
        let id = self.inner.observers.write().await.insert(Box::new(observer));
        self.inner
            .system_event_sender
            .send(SystemEvent::ObserverAdded { id })
            .ok();
        id
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub async fn remove_observer(&self, id: ObserverId) -> bool {
        let was_removed = self.inner.observers.write().await.remove(id).is_some();
        if was_removed {
            self.inner
                .system_event_sender
                .send(SystemEvent::ObserverRemoved { id })
                .ok();
        }
        was_removed
    }

    /// Subscribes to the snapshot published after every tick.
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<TimeSnapshot> {
        self.inner.tick_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.inner.system_event_sender.subscribe()
    }

    /// Subscribes to the `AlarmEvent` stream.
    pub fn subscribe_alarm_events(&self) -> broadcast::Receiver<AlarmEvent> {
        self.inner.alarm_event_sender.subscribe()
    }
}

// Alarm API.
impl ClockEngine {
    /// Starts checking alarms against every tick. Returns `false` if it was
    /// already running.
    ///
    /// The checker consumes the tick stream, so each second the clock shows
    /// is matched exactly once, in order. A checker that falls more than
    /// `channel_capacity` ticks behind skips the seconds it lagged past.
    pub async fn start_alarm_checking(&self) -> bool {
        let weak = self.downgrade();
        let ticks = self.subscribe_ticks();
        let started = self
            .inner
            .alarm_checker
            .lock()
            .await
            .start_consumer(ticks, move |snapshot: TimeSnapshot| {
                let engine = ClockEngine::upgrade(&weak);
                async move {
                    if let Some(engine) = engine {
                        engine.check_reading(&snapshot).await;
                    }
                }
            });
        if started {
            info!("Alarm checking started");
            self.inner
                .system_event_sender
                .send(SystemEvent::AlarmCheckingStarted)
                .ok();
        }
        started
    }

    pub async fn stop_alarm_checking(&self) -> bool {
        let stopped = self
            .inner
            .alarm_checker
            .lock()
            .await
            .stop(self.inner.config.stop_timeout())
            .await;
        if stopped {
            info!("Alarm checking stopped");
            self.inner
                .system_event_sender
                .send(SystemEvent::AlarmCheckingStopped)
                .ok();
        }
        stopped
    }

    pub async fn is_checking_alarms(&self) -> bool {
        self.inner.alarm_checker.lock().await.is_running()
    }

    /// Matches every alarm against the clock's current reading.
    ///
    /// The calendar date and the instant used for silence windows come from
    /// the time source; if it cannot be read this round is skipped.
    pub async fn check_alarms(&self) -> Vec<AlarmId> {
        let snapshot = self.current_time().await;
        self.check_reading(&snapshot).await
    }

    #[doc(hidden)]
    async fn check_reading(&self, snapshot: &TimeSnapshot) -> Vec<AlarmId> {
        match self.read_source() {
            Ok(wall) => self.check_alarms_at(snapshot, wall.date, wall.instant).await,
            Err(e) => {
                warn!(error = %e, "Skipping alarm check; time source unavailable");
                Vec::new()
            }
        }
    }

    /// Matches every alarm against an explicit reading.
    pub async fn check_alarms_at(
        &self,
        snapshot: &TimeSnapshot,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<AlarmId> {
        let ctx = AlarmContext::from_snapshot(snapshot, today, now);
        let fired = self.inner.alarms.write().await.check(&ctx);
        let ids = fired.iter().map(|alarm| alarm.id).collect();
        self.publish_fired(fired, snapshot);
        ids
    }

    /// Validates and stores a new alarm.
    pub async fn create_alarm(&self, request: NewAlarm) -> Result<AlarmId, ClockError> {
        let wall = self.read_source()?;
        let id = self
            .inner
            .alarms
            .write()
            .await
            .create(request, wall.date, wall.instant)?;
        self.inner
            .alarm_event_sender
            .send(AlarmEvent::Created { id })
            .ok();
        Ok(id)
    }

    pub async fn alarm(&self, id: AlarmId) -> Option<Alarm> {
        self.inner.alarms.read().await.get(id).cloned()
    }

    /// All alarms ordered by time of day.
    pub async fn list_alarms(&self) -> Vec<Alarm> {
        self.inner.alarms.read().await.list()
    }

    /// Active alarms that would ring today, per the time source.
    pub async fn alarms_for_today(&self) -> Result<Vec<Alarm>, ClockError> {
        let wall = self.read_source()?;
        Ok(self
            .inner
            .alarms
            .read()
            .await
            .scheduled_for(wall.date, wall.weekday))
    }

    pub async fn toggle_alarm(&self, id: AlarmId) -> Result<bool, ClockError> {
        let active = self.inner.alarms.write().await.toggle(id)?;
        self.inner
            .alarm_event_sender
            .send(AlarmEvent::Toggled { id, active })
            .ok();
        Ok(active)
    }

    pub async fn set_alarm_active(&self, id: AlarmId, active: bool) -> Result<(), ClockError> {
        self.inner.alarms.write().await.set_active(id, active)?;
        self.inner
            .alarm_event_sender
            .send(AlarmEvent::Toggled { id, active })
            .ok();
        Ok(())
    }

    pub async fn delete_alarm(&self, id: AlarmId) -> Result<Alarm, ClockError> {
        let alarm = self.inner.alarms.write().await.delete(id)?;
        self.inner
            .alarm_event_sender
            .send(AlarmEvent::Deleted {
                id,
                title: alarm.title.clone(),
            })
            .ok();
        Ok(alarm)
    }

    /// Dismisses an alarm, silencing it for `silence_minutes` or, with `0`,
    /// deactivating it.
    pub async fn dismiss_alarm(
        &self,
        id: AlarmId,
        silence_minutes: u32,
    ) -> Result<Option<DateTime<Utc>>, ClockError> {
        let now = self.read_source()?.instant;
        let until = self
            .inner
            .alarms
            .write()
            .await
            .dismiss(id, silence_minutes, now)?;
        info!(alarm = ?id, ?until, "Alarm dismissed");
        self.inner
            .alarm_event_sender
            .send(AlarmEvent::Dismissed { id, until })
            .ok();
        Ok(until)
    }

    /// Silences the alarm for its snooze duration.
    pub async fn snooze_alarm(&self, id: AlarmId) -> Result<DateTime<Utc>, ClockError> {
        let now = self.read_source()?.instant;
        let until = self.inner.alarms.write().await.snooze(id, now)?;
        info!(alarm = ?id, %until, "Alarm snoozed");
        self.inner
            .alarm_event_sender
            .send(AlarmEvent::Snoozed { id, until })
            .ok();
        Ok(until)
    }

    /// Attaches a callback run when the alarm fires.
    pub async fn set_alarm_callback(
        &self,
        id: AlarmId,
        callback: impl FnMut(&Alarm) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Result<(), ClockError> {
        let callback: AlarmCallback = Box::new(callback);
        self.inner.alarms.write().await.set_callback(id, callback)
    }

    /// A copy of the alarm activity log, oldest first.
    pub async fn alarm_logs(&self) -> Vec<AlarmLog> {
        self.inner.alarms.read().await.logs().to_vec()
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        debug!("Last engine handle dropped; background loops cancelled");
    }
}
