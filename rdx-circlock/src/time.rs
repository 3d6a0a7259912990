//! Real-time sources the clock can be synchronized against.
//!
//! The engine never reads the system clock directly. It asks a `TimeSource`
//! for a `WallTime`, which keeps tests deterministic and lets the hosting
//! process decide which zone "real time" means.

use crate::error::ClockError;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// A broken-down wall-clock reading in some zone, plus the absolute instant
/// it was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub date: NaiveDate,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0=Monday..6=Sunday.
    pub weekday: u8,
    pub instant: DateTime<Utc>,
}

impl WallTime {
    /// Converts a zoned timestamp into its wall-clock fields.
    pub fn from_zoned<Z: TimeZone>(at: &DateTime<Z>) -> Self {
        Self {
            date: at.date_naive(),
            hour: at.hour() as u8,
            minute: at.minute() as u8,
            second: at.second() as u8,
            weekday: at.weekday().num_days_from_monday() as u8,
            instant: at.with_timezone(&Utc),
        }
    }

    /// Reads `instant` as seen from `timezone`.
    pub fn in_zone(instant: DateTime<Utc>, timezone: Tz) -> Self {
        Self::from_zoned(&instant.with_timezone(&timezone))
    }
}

/// Anything that can report the current wall-clock time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Result<WallTime, ClockError>;
}

/// Reads the system clock and converts it into a fixed IANA zone.
#[derive(Debug, Clone, Copy)]
pub struct ZonedTimeSource {
    timezone: Tz,
}

impl ZonedTimeSource {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// The zone the clock face was built for.
    pub fn colombia() -> Self {
        Self::new(chrono_tz::America::Bogota)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

impl TimeSource for ZonedTimeSource {
    fn now(&self) -> Result<WallTime, ClockError> {
        Ok(WallTime::in_zone(Utc::now(), self.timezone))
    }
}

/// Always reports the same reading. Useful for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    reading: WallTime,
}

impl FixedTimeSource {
    pub fn new(reading: WallTime) -> Self {
        Self { reading }
    }

    /// A reading of `date` at `hour:minute:second` in `timezone`.
    ///
    /// Returns `None` if the local time does not exist in that zone.
    pub fn at(timezone: Tz, date: NaiveDate, hour: u32, minute: u32, second: u32) -> Option<Self> {
        let local = date.and_hms_opt(hour, minute, second)?;
        let zoned = timezone.from_local_datetime(&local).single()?;
        Some(Self::new(WallTime::from_zoned(&zoned)))
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Result<WallTime, ClockError> {
        Ok(self.reading)
    }
}
