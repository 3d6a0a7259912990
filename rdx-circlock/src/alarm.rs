//! The alarm entity and the single rule that decides whether it rings.
//!
//! Alarms are entered on a 12-hour dial (hour 1..12 plus AM/PM) but matched
//! against the clock's canonical 24h hour. A weekday, a calendar date, or
//! neither can restrict which days an alarm rings; neither means every day.

use crate::common::AlarmId;
use crate::error::ClockError;
use crate::events::{Period, TimeSnapshot};
use crate::rings::WEEKDAY_LABELS;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Alarm";

/// How an alarm may be snoozed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozePolicy {
    pub enabled: bool,
    pub duration_minutes: u32,
    pub max_count: u32,
}

impl Default for SnoozePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_minutes: 5,
            max_count: 3,
        }
    }
}

/// A request to create an alarm. Validated by `AlarmRegistry::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlarm {
    pub title: String,
    pub description: String,
    /// Dial hour, 1..12.
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub period: Period,
    /// 0=Monday..6=Sunday.
    pub day_of_week: Option<u8>,
    pub alarm_date: Option<NaiveDate>,
    pub repeat_daily: bool,
    pub snooze: SnoozePolicy,
}

impl NewAlarm {
    /// An every-day alarm at `hour:minute:00 period`.
    pub fn new(hour: u8, minute: u8, period: Period) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            hour,
            minute,
            second: 0,
            period,
            day_of_week: None,
            alarm_date: None,
            repeat_daily: false,
            snooze: SnoozePolicy::default(),
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn at_second(mut self, second: u8) -> Self {
        self.second = second;
        self
    }

    pub fn on_weekday(mut self, day_of_week: u8) -> Self {
        self.day_of_week = Some(day_of_week);
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.alarm_date = Some(date);
        self
    }

    pub fn repeating_daily(mut self) -> Self {
        self.repeat_daily = true;
        self
    }

    pub fn with_snooze(mut self, snooze: SnoozePolicy) -> Self {
        self.snooze = snooze;
        self
    }

    /// Checks every field against its domain. A one-off date may be today
    /// but not earlier.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ClockError> {
        ClockError::check_range("hour", self.hour, 1, 12)?;
        ClockError::check_range("minute", self.minute, 0, 59)?;
        ClockError::check_range("second", self.second, 0, 59)?;
        if let Some(day) = self.day_of_week {
            if day > 6 {
                return Err(ClockError::InvalidWeekday(day));
            }
        }
        if let Some(date) = self.alarm_date {
            if date < today {
                return Err(ClockError::PastDate(date));
            }
        }
        Ok(())
    }
}

/// Parses a `YYYY-MM-DD` calendar date for a one-off alarm.
pub fn parse_alarm_date(input: &str) -> Result<NaiveDate, ClockError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ClockError::InvalidDate(input.to_string()))
}

/// Converts a dial hour and period into the canonical 0..23 hour.
pub fn to_24h(hour12: u8, period: Period) -> u8 {
    match (hour12 % 12, period) {
        (h, Period::AM) => h,
        (h, Period::PM) => h + 12,
    }
}

/// A stored alarm and its trigger bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub title: String,
    pub description: String,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub period: Period,
    pub day_of_week: Option<u8>,
    pub alarm_date: Option<NaiveDate>,
    pub active: bool,
    pub repeat_daily: bool,
    pub snooze: SnoozePolicy,
    pub snooze_count: u32,
    pub triggered_today: bool,
    pub times_triggered: u64,
    pub last_triggered: Option<DateTime<Utc>>,
    pub silenced_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alarm {
    /// Builds the stored form of an already validated request.
    pub(crate) fn from_request(id: AlarmId, request: NewAlarm, created_at: DateTime<Utc>) -> Self {
        let title = match request.title.trim() {
            "" => DEFAULT_TITLE.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            id,
            title,
            description: request.description,
            hour: request.hour,
            minute: request.minute,
            second: request.second,
            period: request.period,
            day_of_week: request.day_of_week,
            alarm_date: request.alarm_date,
            active: true,
            repeat_daily: request.repeat_daily,
            snooze: request.snooze,
            snooze_count: 0,
            triggered_today: false,
            times_triggered: 0,
            last_triggered: None,
            silenced_until: None,
            created_at,
        }
    }

    pub fn hour24(&self) -> u8 {
        to_24h(self.hour, self.period)
    }

    /// `"HH:MM:SS AM|PM"` on the dial the alarm was entered on.
    pub fn time_display(&self) -> String {
        format!(
            "{:02}:{:02}:{:02} {}",
            self.hour, self.minute, self.second, self.period
        )
    }

    /// Human description of which days the alarm rings.
    pub fn schedule_display(&self) -> String {
        match (self.alarm_date, self.day_of_week) {
            (Some(date), _) => date.format("%Y-%m-%d").to_string(),
            (None, Some(day)) => WEEKDAY_LABELS
                .get(day as usize)
                .copied()
                .unwrap_or("?")
                .to_string(),
            (None, None) => "Every day".to_string(),
        }
    }

    pub fn is_time_to_trigger(&self, hour24: u8, minute: u8, second: u8) -> bool {
        self.active && self.hour24() == hour24 && self.minute == minute && self.second == second
    }

    /// Whether the alarm's day restriction allows `date` / `weekday`.
    pub fn is_scheduled_for(&self, date: NaiveDate, weekday: u8) -> bool {
        self.repeat_daily
            || self.alarm_date == Some(date)
            || self.day_of_week == Some(weekday)
            || (self.day_of_week.is_none() && self.alarm_date.is_none())
    }

    pub fn is_silenced(&self, now: DateTime<Utc>) -> bool {
        self.silenced_until.is_some_and(|until| until > now)
    }

    /// The full trigger rule for one clock reading.
    pub fn matches(&self, ctx: &AlarmContext) -> bool {
        self.is_time_to_trigger(ctx.hour24, ctx.minute, ctx.second)
            && self.is_scheduled_for(ctx.today, ctx.weekday)
            && !self.is_silenced(ctx.now)
            && !(self.triggered_today && !self.repeat_daily)
    }

    pub(crate) fn silence_for(&mut self, now: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
        let until = now + Duration::minutes(i64::from(minutes));
        self.silenced_until = Some(until);
        until
    }
}

/// Everything an alarm is matched against on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmContext {
    pub hour24: u8,
    pub minute: u8,
    pub second: u8,
    /// 0=Monday..6=Sunday.
    pub weekday: u8,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

impl AlarmContext {
    /// Combines the clock's reading with the calendar date and instant the
    /// host considers "now".
    pub fn from_snapshot(snapshot: &TimeSnapshot, today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            hour24: snapshot.hour24,
            minute: snapshot.minute,
            second: snapshot.second,
            weekday: snapshot.weekday_index,
            today,
            now,
        }
    }

    pub fn is_midnight(&self) -> bool {
        self.hour24 == 0 && self.minute == 0 && self.second == 0
    }
}

/// What happened in an `AlarmLog` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Triggered,
    Snoozed,
    Dismissed,
}

/// An append-only record of alarm activity.
///
/// `alarm_title` is copied at write time so the entry still reads sensibly
/// after the alarm is deleted and `alarm` is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmLog {
    pub alarm: Option<AlarmId>,
    pub alarm_title: String,
    pub status: LogStatus,
    pub at: DateTime<Utc>,
    pub user_action: String,
}
