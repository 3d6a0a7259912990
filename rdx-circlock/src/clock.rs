//! The synchronous heart of the clock: rings, cascade, and derived outputs.
//!
//! `ClockState` knows nothing about threads or timers. `ClockEngine` wraps it
//! in a lock and drives `advance_second` from a background task.

use crate::error::ClockError;
use crate::events::{HandAngles, HourFormat, Period, TimeSnapshot};
use crate::rings::{to_12h, TimeRings};
use crate::time::WallTime;
use tracing::debug;

/// How far a call to `advance_second` carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Carry {
    /// Only the seconds ring moved.
    None,
    /// Seconds wrapped and the minute advanced.
    Minute,
    /// Minutes wrapped and the hour advanced.
    Hour,
    /// The 24h ring wrapped to 0 and the weekday advanced.
    Day,
}

/// The clock's displayed time, held in rings.
#[derive(Debug, Clone)]
pub struct ClockState {
    rings: TimeRings,
    format: HourFormat,
}

impl ClockState {
    pub fn new(format: HourFormat) -> Self {
        Self {
            rings: TimeRings::new(),
            format,
        }
    }

    /// Aligns every ring with `now`.
    ///
    /// All fields are validated first; on error nothing changes.
    pub fn sync_with_real_time(&mut self, now: &WallTime) -> Result<(), ClockError> {
        validate_time(now.hour, now.minute, now.second)?;
        if now.weekday > 6 {
            return Err(ClockError::InvalidWeekday(now.weekday));
        }
        self.apply_time(now.hour, now.minute, now.second);
        self.rings.weekdays.seek_index(now.weekday)?;
        debug!(
            hour = now.hour,
            minute = now.minute,
            second = now.second,
            weekday = now.weekday,
            "Clock synchronized"
        );
        Ok(())
    }

    /// Switches the displayed hour ring. Stored values are untouched.
    pub fn set_format(&mut self, format: HourFormat) {
        self.format = format;
    }

    pub fn format(&self) -> HourFormat {
        self.format
    }

    /// Sets the time directly, bypassing the cascade. The weekday is kept.
    pub fn set_time(&mut self, hour24: u8, minute: u8, second: u8) -> Result<(), ClockError> {
        validate_time(hour24, minute, second)?;
        self.apply_time(hour24, minute, second);
        Ok(())
    }

    /// Sets the weekday by index (0=Monday..6=Sunday).
    pub fn set_weekday(&mut self, index: u8) -> Result<(), ClockError> {
        self.rings.weekdays.seek_index(index)
    }

    fn apply_time(&mut self, hour24: u8, minute: u8, second: u8) {
        self.rings.hours24.seek(&hour24);
        self.rings.hours12.seek(&to_12h(hour24));
        self.rings.minutes.seek(&minute);
        self.rings.seconds.seek(&second);
    }

    /// Advances one second, carrying into minutes, hours and the weekday
    /// only when the lower unit wraps.
    pub fn advance_second(&mut self) -> Carry {
        self.rings.seconds.advance();
        if self.rings.second() == 0 {
            self.advance_minute()
        } else {
            Carry::None
        }
    }

    pub fn advance_minute(&mut self) -> Carry {
        self.rings.minutes.advance();
        if self.rings.minute() == 0 {
            self.advance_hour()
        } else {
            Carry::Minute
        }
    }

    pub fn advance_hour(&mut self) -> Carry {
        self.rings.hours24.advance();
        self.rings.align_hours12();
        if self.rings.hour24() == 0 {
            self.rings.weekdays.advance();
            Carry::Day
        } else {
            Carry::Hour
        }
    }

    pub fn current_time(&self) -> TimeSnapshot {
        let hour24 = self.rings.hour24();
        let (hour, period) = if self.format.is_24h() {
            (hour24, None)
        } else {
            (self.rings.hour12(), Some(Period::of_hour24(hour24)))
        };
        TimeSnapshot {
            hour,
            minute: self.rings.minute(),
            second: self.rings.second(),
            weekday_index: self.rings.weekdays.index(),
            weekday_label: self.rings.weekdays.label(),
            period,
            hour24,
            format: self.format,
        }
    }

    pub fn hour12(&self) -> u8 {
        self.rings.hour12()
    }

    pub fn seconds_angle(&self) -> f64 {
        (f64::from(self.rings.second()) * 6.0) % 360.0
    }

    /// The minute hand creeps 0.1° per second.
    pub fn minutes_angle(&self) -> f64 {
        (f64::from(self.rings.minute()) * 6.0 + f64::from(self.rings.second()) * 0.1) % 360.0
    }

    /// The hour hand creeps 0.5° per minute.
    pub fn hours_angle(&self) -> f64 {
        (f64::from(self.rings.hour12()) * 30.0 + f64::from(self.rings.minute()) * 0.5) % 360.0
    }

    pub fn angles(&self) -> HandAngles {
        HandAngles {
            hours: self.hours_angle(),
            minutes: self.minutes_angle(),
            seconds: self.seconds_angle(),
        }
    }

    /// `"HH:MM:SS AM|PM"` regardless of the active format.
    pub fn format_12h(&self) -> String {
        let hour24 = self.rings.hour24();
        format!(
            "{:02}:{:02}:{:02} {}",
            self.rings.hour12(),
            self.rings.minute(),
            self.rings.second(),
            Period::of_hour24(hour24)
        )
    }

    /// `"HH:MM:SS"` on the canonical hour regardless of the active format.
    pub fn format_24h(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            self.rings.hour24(),
            self.rings.minute(),
            self.rings.second()
        )
    }

    /// The time string in the active format.
    pub fn format_time(&self) -> String {
        if self.format.is_24h() {
            self.format_24h()
        } else {
            self.format_12h()
        }
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new(HourFormat::default())
    }
}

fn validate_time(hour24: u8, minute: u8, second: u8) -> Result<(), ClockError> {
    ClockError::check_range("hour", hour24, 0, 23)?;
    ClockError::check_range("minute", minute, 0, 59)?;
    ClockError::check_range("second", second, 0, 59)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use test_case::test_case;

    fn clock_at(hour24: u8, minute: u8, second: u8) -> ClockState {
        let mut clock = ClockState::default();
        clock.set_time(hour24, minute, second).unwrap();
        clock
    }

    #[test]
    fn sixty_seconds_carry_one_minute() {
        let mut clock = clock_at(7, 14, 0);
        for _ in 0..59 {
            assert_eq!(clock.advance_second(), Carry::None);
        }
        assert_eq!(clock.advance_second(), Carry::Minute);
        let now = clock.current_time();
        assert_eq!((now.hour24, now.minute, now.second), (7, 15, 0));
    }

    #[test]
    fn an_hour_of_seconds_carries_one_hour() {
        let mut clock = clock_at(7, 0, 0);
        for _ in 0..3600 {
            clock.advance_second();
        }
        let now = clock.current_time();
        assert_eq!((now.hour24, now.minute, now.second), (8, 0, 0));
        assert_eq!(now.weekday_index, 0);
    }

    #[test]
    fn midnight_rolls_the_weekday() {
        let mut clock = clock_at(23, 59, 59);
        clock.set_weekday(6).unwrap();
        assert_eq!(clock.advance_second(), Carry::Day);
        let now = clock.current_time();
        assert_eq!(now.hour24, 0);
        assert_eq!(now.hour, 12);
        assert_eq!(now.period, Some(Period::AM));
        assert_eq!(now.weekday_label, "Monday");
    }

    #[test]
    fn noon_keeps_the_weekday() {
        let mut clock = clock_at(11, 59, 59);
        clock.set_weekday(3).unwrap();
        assert_eq!(clock.advance_second(), Carry::Hour);
        let now = clock.current_time();
        assert_eq!(now.hour, 12);
        assert_eq!(now.period, Some(Period::PM));
        assert_eq!(now.weekday_index, 3);
    }

    #[test_case(0 => 12)]
    #[test_case(1 => 1)]
    #[test_case(6 => 6)]
    #[test_case(12 => 12)]
    #[test_case(13 => 1)]
    #[test_case(18 => 6)]
    #[test_case(23 => 11)]
    fn set_time_mirrors_12h_hour(hour24: u8) -> u8 {
        clock_at(hour24, 0, 0).hour12()
    }

    #[test]
    fn set_time_mirrors_every_hour() {
        let mut clock = clock_at(0, 0, 0);
        for hour24 in 0..24u8 {
            clock.set_time(hour24, 0, 0).unwrap();
            let expected = match hour24 {
                0 => 12,
                1..=12 => hour24,
                _ => hour24 - 12,
            };
            assert_eq!(clock.hour12(), expected, "hour24 = {hour24}");
            assert_eq!(clock.hour12(), to_12h(hour24));
            let period = if hour24 < 12 { Period::AM } else { Period::PM };
            assert_eq!(clock.current_time().period, Some(period));
        }
    }

    #[test]
    fn hour_rings_stay_paired_through_a_day() {
        let mut clock = clock_at(0, 0, 0);
        for _ in 0..24 {
            let hour24 = clock.current_time().hour24;
            assert_eq!(clock.hour12(), to_12h(hour24));
            clock.advance_hour();
        }
        assert_eq!(clock.current_time().hour24, 0);
    }

    #[test]
    fn set_time_rejects_out_of_range_without_mutating() {
        let mut clock = clock_at(9, 41, 7);
        let err = clock.set_time(24, 0, 0).unwrap_err();
        assert!(matches!(err, ClockError::OutOfRange { field: "hour", .. }));
        assert!(clock.set_time(9, 60, 0).is_err());
        assert!(clock.set_time(9, 0, 60).is_err());
        assert_eq!(clock.format_24h(), "09:41:07");
    }

    #[test]
    fn format_flag_only_changes_presentation() {
        let mut clock = clock_at(15, 4, 5);
        assert_eq!(clock.format_time(), "03:04:05 PM");
        clock.set_format(HourFormat::TwentyFourHour);
        assert_eq!(clock.format_time(), "15:04:05");
        let now = clock.current_time();
        assert_eq!(now.hour, 15);
        assert_eq!(now.period_marker(), "");
        clock.set_format(HourFormat::TwelveHour);
        let now = clock.current_time();
        assert_eq!((now.hour, now.period_marker(), now.hour24), (3, "PM", 15));
    }

    #[test]
    fn midnight_formats_as_twelve_am() {
        let clock = clock_at(0, 0, 9);
        assert_eq!(clock.format_12h(), "12:00:09 AM");
        assert_eq!(clock.format_24h(), "00:00:09");
    }

    #[test]
    fn angle_contracts() {
        assert_eq!(clock_at(0, 0, 30).seconds_angle(), 180.0);
        assert_eq!(clock_at(0, 30, 0).minutes_angle(), 180.0);
        assert_eq!(clock_at(6, 0, 0).hours_angle(), 180.0);
        assert_eq!(clock_at(3, 30, 0).hours_angle(), 105.0);
        // 12 o'clock folds back onto the top of the dial.
        assert_eq!(clock_at(12, 0, 0).hours_angle(), 0.0);
    }

    #[test]
    fn minute_hand_creeps_with_seconds() {
        let angles = clock_at(18, 15, 30).angles();
        assert!((angles.minutes - 93.0).abs() < 1e-9);
        assert!((angles.hours - 187.5).abs() < 1e-9);
        assert_eq!(angles.seconds, 180.0);
    }

    #[test]
    fn sync_sets_every_ring() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 17, 23, 45, 12).unwrap();
        let now = WallTime::in_zone(instant, chrono_tz::America::Bogota);
        let mut clock = ClockState::default();
        clock.sync_with_real_time(&now).unwrap();
        let snapshot = clock.current_time();
        assert_eq!(snapshot.hour24, 18);
        assert_eq!(snapshot.hour, 6);
        assert_eq!((snapshot.minute, snapshot.second), (45, 12));
        assert_eq!(snapshot.weekday_label, "Saturday");
    }

    #[test]
    fn sync_rejects_malformed_reading() {
        let mut clock = clock_at(1, 2, 3);
        let bad = WallTime {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            hour: 10,
            minute: 0,
            second: 0,
            weekday: 9,
            instant: Utc::now(),
        };
        assert_eq!(
            clock.sync_with_real_time(&bad),
            Err(ClockError::InvalidWeekday(9))
        );
        assert_eq!(clock.format_24h(), "01:02:03");
    }
}
