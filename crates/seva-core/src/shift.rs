//! Shift-time arithmetic for attendance settlement.

use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_SHIFT_END, DEFAULT_SHIFT_START, POINTS_PER_HOUR};
use crate::error::{CoreError, CoreResult};

/// Wall-clock time of day in `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShiftTime {
    hour: u8,
    minute: u8,
}

impl ShiftTime {
    /// ## Errors
    /// Returns `CoreError::InvalidInput` when hour or minute is out of range.
    pub fn new(hour: u8, minute: u8) -> CoreResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(CoreError::InvalidInput(format!(
                "time {hour:02}:{minute:02} is out of range"
            )));
        }
        Ok(Self { hour, minute })
    }

    #[must_use]
    pub fn minutes_since_midnight(self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }
}

impl FromStr for ShiftTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidInput(format!("'{s}' is not a HH:MM time"));
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if !(1..=2).contains(&hour.len()) || minute.len() != 2 {
            return Err(invalid());
        }
        let hour = parse_digits(hour).ok_or_else(invalid)?;
        let minute = parse_digits(minute).ok_or_else(invalid)?;
        Self::new(hour, minute)
    }
}

/// ASCII digits only, no sign.
fn parse_digits(field: &str) -> Option<u8> {
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl fmt::Display for ShiftTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A same-day shift with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub start: ShiftTime,
    pub end: ShiftTime,
}

impl Shift {
    /// ## Errors
    /// Returns `CoreError::ValidationError` when the end is not after the start.
    pub fn new(start: ShiftTime, end: ShiftTime) -> CoreResult<Self> {
        if end <= start {
            return Err(CoreError::ValidationError(format!(
                "shift end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// ## Summary
    /// Builds a shift from optional stored bounds, defaulting blanks to
    /// 09:00 and 17:00.
    ///
    /// ## Errors
    /// Returns an error when either bound fails to parse or the range is empty.
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> CoreResult<Self> {
        let pick = |value: Option<&str>, default: &str| -> CoreResult<ShiftTime> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .parse()
        };
        Self::new(
            pick(start, DEFAULT_SHIFT_START)?,
            pick(end, DEFAULT_SHIFT_END)?,
        )
    }

    #[must_use]
    pub fn minutes(&self) -> i64 {
        self.end.minutes_since_midnight() - self.start.minutes_since_midnight()
    }
}

/// Whole hours times the hourly rate; partial hours earn nothing.
#[must_use]
pub fn points_for_minutes(minutes: i64) -> i64 {
    if minutes <= 0 {
        return 0;
    }
    (minutes / 60) * POINTS_PER_HOUR
}
