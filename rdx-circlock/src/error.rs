//! The error type returned by every fallible engine operation.
//!
//! Range checks run before any ring or alarm is touched, so an `Err` always
//! means the engine state is exactly as it was before the call.

use crate::common::AlarmId;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("invalid weekday index {0} (expected 0=Monday..6=Sunday)")]
    InvalidWeekday(u8),

    #[error("invalid period {0:?} (expected AM or PM)")]
    InvalidPeriod(String),

    #[error("invalid calendar date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("alarm date {0} is in the past")]
    PastDate(NaiveDate),

    #[error("alarm {0:?} not found")]
    AlarmNotFound(AlarmId),

    #[error("snooze is disabled for this alarm")]
    SnoozeDisabled,

    #[error("snooze limit reached ({max} snoozes)")]
    SnoozeLimitReached { max: u32 },

    #[error("real-time source unavailable: {0}")]
    SyncUnavailable(String),
}

impl ClockError {
    /// Checks `value` against an inclusive range, naming the field on failure.
    pub(crate) fn check_range(
        field: &'static str,
        value: impl Into<i64>,
        min: i64,
        max: i64,
    ) -> Result<(), ClockError> {
        let value = value.into();
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(ClockError::OutOfRange {
                field,
                value,
                min,
                max,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_names_the_field() {
        let err = ClockError::check_range("minute", 60u8, 0, 59).unwrap_err();
        assert_eq!(err.to_string(), "minute out of range: 60 (expected 0..=59)");
        assert!(ClockError::check_range("minute", 59u8, 0, 59).is_ok());
    }
}
