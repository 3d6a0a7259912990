//! The concrete rings a clock face is made of.
//!
//! Two hour rings exist side by side: `{0..23}` for canonical time and
//! `{1..12}` for the 12-hour dial. They are independent rings; `ClockState`
//! keeps them pointing at the same instant.

use crate::error::ClockError;
use crate::ring::RingSequence;

/// Weekday labels in ring order, index 0 being Monday.
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Builds the canonical `{0..23}` hour ring.
pub fn hours_24() -> RingSequence<u8> {
    (0..24).collect()
}

/// Builds the `{1..12}` dial hour ring.
pub fn hours_12() -> RingSequence<u8> {
    (1..=12).collect()
}

/// Builds a `{0..59}` ring, used for both minutes and seconds.
pub fn sexagesimal() -> RingSequence<u8> {
    (0..60).collect()
}

/// Maps a canonical hour onto the 12-hour dial: 0 → 12, 13..23 → h-12.
pub fn to_12h(hour24: u8) -> u8 {
    match hour24 {
        0 => 12,
        1..=12 => hour24,
        _ => hour24 - 12,
    }
}

/// Whether a canonical hour falls in the AM half of the day.
pub fn is_am(hour24: u8) -> bool {
    hour24 < 12
}

/// Looks up the numeric index (0=Monday..6=Sunday) of a weekday label.
pub fn weekday_index(label: &str) -> Option<u8> {
    WEEKDAY_LABELS
        .iter()
        .position(|candidate| *candidate == label)
        .map(|index| index as u8)
}

/// The seven weekday labels as a ring, starting on Monday.
#[derive(Debug, Clone)]
pub struct WeekdayRing {
    ring: RingSequence<&'static str>,
}

impl WeekdayRing {
    pub fn new() -> Self {
        Self {
            ring: WEEKDAY_LABELS.into_iter().collect(),
        }
    }

    /// Moves the cursor to the day with the given index.
    pub fn seek_index(&mut self, index: u8) -> Result<(), ClockError> {
        let label = WEEKDAY_LABELS
            .get(index as usize)
            .ok_or(ClockError::InvalidWeekday(index))?;
        self.ring.seek(label);
        Ok(())
    }

    pub fn advance(&mut self) {
        self.ring.advance();
    }

    pub fn retreat(&mut self) {
        self.ring.retreat();
    }

    pub fn label(&self) -> &'static str {
        self.ring.current().copied().unwrap_or(WEEKDAY_LABELS[0])
    }

    pub fn index(&self) -> u8 {
        weekday_index(self.label()).unwrap_or(0)
    }
}

impl Default for WeekdayRing {
    fn default() -> Self {
        Self::new()
    }
}

/// The full set of rings backing one clock.
#[derive(Debug, Clone)]
pub struct TimeRings {
    pub hours24: RingSequence<u8>,
    pub hours12: RingSequence<u8>,
    pub minutes: RingSequence<u8>,
    pub seconds: RingSequence<u8>,
    pub weekdays: WeekdayRing,
}

impl TimeRings {
    /// Builds all rings at 00:00:00 Monday, with the 12h ring aligned to 12.
    pub fn new() -> Self {
        let mut rings = Self {
            hours24: hours_24(),
            hours12: hours_12(),
            minutes: sexagesimal(),
            seconds: sexagesimal(),
            weekdays: WeekdayRing::new(),
        };
        rings.align_hours12();
        rings
    }

    /// Re-derives the 12h cursor from the 24h cursor.
    pub fn align_hours12(&mut self) {
        let hour12 = to_12h(self.hour24());
        self.hours12.seek(&hour12);
    }

    pub fn hour24(&self) -> u8 {
        self.hours24.current().copied().unwrap_or(0)
    }

    pub fn hour12(&self) -> u8 {
        self.hours12.current().copied().unwrap_or(12)
    }

    pub fn minute(&self) -> u8 {
        self.minutes.current().copied().unwrap_or(0)
    }

    pub fn second(&self) -> u8 {
        self.seconds.current().copied().unwrap_or(0)
    }
}

impl Default for TimeRings {
    fn default() -> Self {
        Self::new()
    }
}
