//! Defines the values the engine hands out and the events it broadcasts.
//!
//! Collaborators read `TimeSnapshot`s (from `current_time`, observers, or the
//! tick stream) and subscribe to `SystemEvent` / `AlarmEvent` streams to react
//! to lifecycle and alarm activity.

use crate::common::{AlarmId, ObserverId};
use crate::error::ClockError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::Instant;

/// Half of the day on a 12-hour dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    AM,
    PM,
}

impl Period {
    pub fn of_hour24(hour24: u8) -> Self {
        if crate::rings::is_am(hour24) {
            Period::AM
        } else {
            Period::PM
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::AM => "AM",
            Period::PM => "PM",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Period::AM),
            "PM" => Ok(Period::PM),
            _ => Err(ClockError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Which hour ring the clock displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HourFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl HourFormat {
    pub fn from_24h_flag(is_24h: bool) -> Self {
        if is_24h {
            HourFormat::TwentyFourHour
        } else {
            HourFormat::TwelveHour
        }
    }

    pub fn is_24h(&self) -> bool {
        matches!(self, HourFormat::TwentyFourHour)
    }
}

/// A consistent reading of everything the clock shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSnapshot {
    /// Hour in the active format: 1..12 or 0..23.
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday_index: u8,
    pub weekday_label: &'static str,
    /// `None` in 24h mode.
    pub period: Option<Period>,
    /// Canonical 0..23 hour, present in both formats.
    pub hour24: u8,
    pub format: HourFormat,
}

impl TimeSnapshot {
    /// The AM/PM marker, or an empty string in 24h mode.
    pub fn period_marker(&self) -> &'static str {
        self.period.map(|p| p.as_str()).unwrap_or("")
    }

    /// Whether the canonical time is exactly 00:00:00.
    pub fn is_midnight(&self) -> bool {
        self.hour24 == 0 && self.minute == 0 && self.second == 0
    }
}

/// Hand positions in degrees, each in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandAngles {
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
}

/// Events related to the lifecycle and state of the clock itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired when the one-second ticker starts running.
    EngineStarted { timestamp: Instant },
    /// Fired after the ticker has been stopped and joined.
    EngineStopped,
    AlarmCheckingStarted,
    AlarmCheckingStopped,
    /// The clock was aligned with its time source.
    Synced { snapshot: TimeSnapshot },
    /// The time source could not be read; the clock kept its previous state.
    SyncFailed { reason: String },
    /// The time was set by hand.
    TimeSet { snapshot: TimeSnapshot },
    FormatChanged { format: HourFormat },
    ObserverAdded { id: ObserverId },
    ObserverRemoved { id: ObserverId },
    /// An observer returned an error or panicked during notification.
    ObserverFailed { id: ObserverId, reason: String },
}

/// Events related to alarms and user actions on them.
#[derive(Debug, Clone)]
pub enum AlarmEvent {
    Created { id: AlarmId },
    Deleted { id: AlarmId, title: String },
    Toggled { id: AlarmId, active: bool },
    /// An alarm matched the clock and fired.
    Triggered {
        id: AlarmId,
        title: String,
        snapshot: TimeSnapshot,
    },
    /// The alarm's callback returned an error or panicked.
    CallbackFailed { id: AlarmId, reason: String },
    /// Dismissed with a silence window, or deactivated when `until` is `None`.
    Dismissed {
        id: AlarmId,
        until: Option<DateTime<Utc>>,
    },
    Snoozed { id: AlarmId, until: DateTime<Utc> },
}
