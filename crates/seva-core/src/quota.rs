//! Department-month bonus budget arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};

/// Calendar month in `YYYY-MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// ## Errors
    /// Returns `CoreError::InvalidInput` for a year outside 1000..=9999 or a
    /// month outside 1..=12.
    pub fn new(year: i32, month: u32) -> CoreResult<Self> {
        if !(1000..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(CoreError::InvalidInput(format!(
                "{year}-{month:02} is not a valid month"
            )));
        }
        Ok(Self { year, month })
    }

    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }
}

impl FromStr for YearMonth {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidInput(format!("'{s}' is not a YYYY-MM month"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
            return Err(invalid());
        }
        let year = year.parse::<i32>().ok().ok_or_else(invalid)?;
        let month = month.parse::<u32>().ok().ok_or_else(invalid)?;
        Self::new(year, month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Budget state of one department-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub quota_points: i64,
    pub approved_points: i64,
}

/// A request that would push approved points past the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaOverrun {
    pub quota: i64,
    pub approved: i64,
    pub requested: i64,
}

impl QuotaUsage {
    #[must_use]
    pub fn remaining(&self) -> i64 {
        self.quota_points - self.approved_points
    }

    /// ## Summary
    /// Checks `approved + requested <= quota`; the boundary is inclusive.
    ///
    /// ## Errors
    /// Returns the overrun details when the request does not fit.
    pub fn admit(&self, requested: i64) -> Result<(), QuotaOverrun> {
        if self.approved_points.saturating_add(requested) > self.quota_points {
            return Err(QuotaOverrun {
                quota: self.quota_points,
                approved: self.approved_points,
                requested,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn year_month_round_trips_through_text() {
        let ym: YearMonth = "2026-03".parse().unwrap();
        assert_eq!(ym.year(), 2026);
        assert_eq!(ym.month(), 3);
        assert_eq!(ym.to_string(), "2026-03");
        let date = NaiveDate::from_ymd_opt(2026, 11, 30).unwrap();
        assert_eq!(YearMonth::of(date).to_string(), "2026-11");
    }

    #[test_log::test]
    fn year_month_rejects_malformed_text() {
        for bad in ["2026-3", "2026-13", "2026-00", "26-03", "2026/03", "2026-+3", "abcd-ef", ""] {
            assert!(bad.parse::<YearMonth>().is_err(), "accepted {bad:?}");
        }
    }

    #[test_log::test]
    fn year_month_serde_is_a_string() {
        let ym: YearMonth = serde_json::from_str("\"2025-12\"").unwrap();
        assert_eq!(serde_json::to_string(&ym).unwrap(), "\"2025-12\"");
        assert!(serde_json::from_str::<YearMonth>("\"2025-1\"").is_err());
    }

    #[test_log::test]
    fn quota_boundary_is_inclusive() {
        let usage = QuotaUsage {
            quota_points: 1000,
            approved_points: 800,
        };
        assert_eq!(usage.admit(200), Ok(()));
        assert_eq!(
            usage.admit(300),
            Err(QuotaOverrun {
                quota: 1000,
                approved: 800,
                requested: 300
            })
        );
        assert_eq!(usage.remaining(), 200);
    }

    #[test_log::test]
    fn empty_quota_admits_nothing_positive() {
        let usage = QuotaUsage {
            quota_points: 0,
            approved_points: 0,
        };
        assert!(usage.admit(1).is_err());
        assert!(usage.admit(0).is_ok());
    }
}
