//! In-memory alarm store, trigger checking, and activity log.

use crate::alarm::{Alarm, AlarmContext, AlarmLog, LogStatus, NewAlarm};
use crate::common::{run_isolated, AlarmId, CallbackOutcome};
use crate::error::ClockError;
use chrono::{DateTime, NaiveDate, Utc};
use slotmap::SlotMap;
use tracing::{debug, info, warn};

/// A function run when its alarm fires.
pub type AlarmCallback = Box<dyn FnMut(&Alarm) -> anyhow::Result<()> + Send + Sync>;

struct AlarmSlot {
    alarm: Alarm,
    callback: Option<AlarmCallback>,
}

/// An alarm that fired during `AlarmRegistry::check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredAlarm {
    pub id: AlarmId,
    pub title: String,
    /// Set when the alarm's callback returned an error or panicked.
    pub callback_error: Option<String>,
}

/// Holds every alarm and the log of what happened to them.
#[derive(Default)]
pub struct AlarmRegistry {
    alarms: SlotMap<AlarmId, AlarmSlot>,
    logs: Vec<AlarmLog>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a new alarm. New alarms start active.
    pub fn create(
        &mut self,
        request: NewAlarm,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AlarmId, ClockError> {
        request.validate(today)?;
        let id = self.alarms.insert_with_key(|id| AlarmSlot {
            alarm: Alarm::from_request(id, request, now),
            callback: None,
        });
        if let Some(slot) = self.alarms.get(id) {
            info!(alarm = ?id, title = %slot.alarm.title, time = %slot.alarm.time_display(), "Alarm created");
        }
        Ok(id)
    }

    pub fn get(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.get(id).map(|slot| &slot.alarm)
    }

    /// All alarms ordered by canonical time of day.
    pub fn list(&self) -> Vec<Alarm> {
        let mut alarms: Vec<Alarm> = self.alarms.values().map(|slot| slot.alarm.clone()).collect();
        alarms.sort_by_key(|alarm| (alarm.hour24(), alarm.minute, alarm.second, alarm.created_at));
        alarms
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// Active alarms whose day restriction allows `date`.
    pub fn scheduled_for(&self, date: NaiveDate, weekday: u8) -> Vec<Alarm> {
        self.list()
            .into_iter()
            .filter(|alarm| alarm.active && alarm.is_scheduled_for(date, weekday))
            .collect()
    }

    /// Flips the active flag and returns the new value.
    pub fn toggle(&mut self, id: AlarmId) -> Result<bool, ClockError> {
        let alarm = self.alarm_mut(id)?;
        alarm.active = !alarm.active;
        Ok(alarm.active)
    }

    pub fn set_active(&mut self, id: AlarmId, active: bool) -> Result<(), ClockError> {
        self.alarm_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_callback(&mut self, id: AlarmId, callback: AlarmCallback) -> Result<(), ClockError> {
        let slot = self.alarms.get_mut(id).ok_or(ClockError::AlarmNotFound(id))?;
        slot.callback = Some(callback);
        Ok(())
    }

    /// Removes an alarm. Its log entries stay, detached from the id.
    pub fn delete(&mut self, id: AlarmId) -> Result<Alarm, ClockError> {
        let slot = self.alarms.remove(id).ok_or(ClockError::AlarmNotFound(id))?;
        for entry in self.logs.iter_mut().filter(|entry| entry.alarm == Some(id)) {
            entry.alarm = None;
        }
        info!(alarm = ?id, title = %slot.alarm.title, "Alarm deleted");
        Ok(slot.alarm)
    }

    /// Dismisses a ringing alarm.
    ///
    /// With `silence_minutes > 0` the alarm is silenced until that much time
    /// has passed and the silence deadline is returned; with `0` it is
    /// deactivated and `None` is returned.
    pub fn dismiss(
        &mut self,
        id: AlarmId,
        silence_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ClockError> {
        let alarm = self.alarm_mut(id)?;
        let until = if silence_minutes > 0 {
            Some(alarm.silence_for(now, silence_minutes))
        } else {
            alarm.active = false;
            None
        };
        alarm.snooze_count = 0;
        let title = alarm.title.clone();
        self.record(Some(id), title, LogStatus::Dismissed, now, "user-dismiss");
        Ok(until)
    }

    /// Silences the alarm for its snooze duration.
    pub fn snooze(&mut self, id: AlarmId, now: DateTime<Utc>) -> Result<DateTime<Utc>, ClockError> {
        let alarm = self.alarm_mut(id)?;
        if !alarm.snooze.enabled {
            return Err(ClockError::SnoozeDisabled);
        }
        if alarm.snooze_count >= alarm.snooze.max_count {
            return Err(ClockError::SnoozeLimitReached {
                max: alarm.snooze.max_count,
            });
        }
        alarm.snooze_count += 1;
        let until = alarm.silence_for(now, alarm.snooze.duration_minutes);
        let title = alarm.title.clone();
        self.record(Some(id), title, LogStatus::Snoozed, now, "user-snooze");
        Ok(until)
    }

    /// Fires every alarm matching `ctx`.
    ///
    /// At exactly 00:00:00 the per-day trigger flags are cleared before
    /// matching, so an alarm set for midnight rings on the new day. This is a
    /// polling check: a reading the caller never passes in (a stalled loop
    /// skipping a second) is a missed trigger.
    pub fn check(&mut self, ctx: &AlarmContext) -> Vec<FiredAlarm> {
        if ctx.is_midnight() {
            self.reset_daily();
        }

        let mut fired = Vec::new();
        for (id, slot) in self.alarms.iter_mut() {
            if !slot.alarm.matches(ctx) {
                continue;
            }
            info!(alarm = ?id, title = %slot.alarm.title, time = %slot.alarm.time_display(), "Alarm triggered");

            let outcome = match slot.callback.as_mut() {
                Some(callback) => {
                    let alarm = &slot.alarm;
                    run_isolated(|| (callback)(alarm))
                }
                None => CallbackOutcome::Completed,
            };
            let callback_error = match outcome {
                CallbackOutcome::Completed => None,
                CallbackOutcome::Failed(reason) | CallbackOutcome::Panicked(reason) => {
                    warn!(alarm = ?id, error = %reason, "Alarm callback failed");
                    Some(reason)
                }
            };

            let alarm = &mut slot.alarm;
            alarm.times_triggered += 1;
            alarm.last_triggered = Some(ctx.now);
            if !alarm.repeat_daily {
                alarm.triggered_today = true;
            }
            fired.push(FiredAlarm {
                id,
                title: alarm.title.clone(),
                callback_error,
            });
        }

        for alarm in &fired {
            self.record(
                Some(alarm.id),
                alarm.title.clone(),
                LogStatus::Triggered,
                ctx.now,
                "auto-trigger",
            );
        }
        fired
    }

    /// Clears every alarm's per-day state: `triggered_today` and the
    /// snooze count.
    pub fn reset_daily(&mut self) {
        for slot in self.alarms.values_mut() {
            slot.alarm.triggered_today = false;
            slot.alarm.snooze_count = 0;
        }
        debug!("Daily alarm flags reset");
    }

    /// The activity log, oldest first.
    pub fn logs(&self) -> &[AlarmLog] {
        &self.logs
    }

    fn alarm_mut(&mut self, id: AlarmId) -> Result<&mut Alarm, ClockError> {
        self.alarms
            .get_mut(id)
            .map(|slot| &mut slot.alarm)
            .ok_or(ClockError::AlarmNotFound(id))
    }

    fn record(
        &mut self,
        alarm: Option<AlarmId>,
        alarm_title: String,
        status: LogStatus,
        at: DateTime<Utc>,
        user_action: &str,
    ) {
        self.logs.push(AlarmLog {
            alarm,
            alarm_title,
            status,
            at,
            user_action: user_action.to_string(),
        });
    }
}
