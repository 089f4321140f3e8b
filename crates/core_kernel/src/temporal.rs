//! Calendar handling for the ledger
//!
//! This module provides:
//! - `Timezone`: the firm's local zone, used to decide what "today" is
//! - `DateRange` / `PeriodBounds`: inclusive reporting windows
//! - `EffectiveDated`: lookup of the record in force on a given date

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Earliest date a report window reaches back to when no start is given
pub const REPORT_FLOOR: NaiveDate = match NaiveDate::from_ymd_opt(1900, 1, 1) {
    Some(date) => date,
    None => panic!("invalid report floor"),
};

/// Latest date a report window extends to when no end is given
pub const REPORT_CEILING: NaiveDate = match NaiveDate::from_ymd_opt(2100, 12, 31) {
    Some(date) => date,
    None => panic!("invalid report ceiling"),
};

/// Timezone wrapper for the firm's local calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Calendar date of the given instant in this timezone
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Today's calendar date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Africa::Johannesburg)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// An inclusive calendar range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Optional start/end bounds of a reporting period, both inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PeriodBounds {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if the date falls inside whichever bounds are set
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Fills missing bounds with the report floor and ceiling
    pub fn to_report_range(&self) -> DateRange {
        DateRange {
            start: self.start.unwrap_or(REPORT_FLOOR),
            end: self.end.unwrap_or(REPORT_CEILING),
        }
    }
}

/// A record that takes effect on a calendar date
pub trait EffectiveDated {
    fn effective_date(&self) -> NaiveDate;
}

/// Selects the record in force on `as_of`: the one with the latest effective
/// date not after `as_of`.
///
/// Records sharing an effective date resolve to the one appearing last in the
/// slice, so callers pass records in the order they were appended.
pub fn in_force_on<T: EffectiveDated>(records: &[T], as_of: NaiveDate) -> Option<&T> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.effective_date() <= as_of)
        .max_by_key(|(index, record)| (record.effective_date(), *index))
        .map(|(_, record)| record)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dated(NaiveDate, u32);

    impl EffectiveDated for Dated {
        fn effective_date(&self) -> NaiveDate {
            self.0
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_in_force_on_picks_latest_not_after() {
        let records = vec![Dated(date(2024, 6, 1), 150), Dated(date(2024, 1, 1), 100)];

        assert_eq!(in_force_on(&records, date(2024, 3, 1)).map(|r| r.1), Some(100));
        assert_eq!(in_force_on(&records, date(2024, 6, 1)).map(|r| r.1), Some(150));
        assert!(in_force_on(&records, date(2023, 12, 31)).is_none());
    }

    #[test]
    fn test_in_force_on_same_day_prefers_last_appended() {
        let records = vec![Dated(date(2024, 1, 1), 100), Dated(date(2024, 1, 1), 120)];
        assert_eq!(in_force_on(&records, date(2024, 1, 1)).map(|r| r.1), Some(120));
    }

    #[test]
    fn test_period_bounds_report_range_uses_sentinels() {
        let range = PeriodBounds::unbounded().to_report_range();
        assert_eq!(range.start, REPORT_FLOOR);
        assert_eq!(range.end, REPORT_CEILING);
    }

    #[test]
    fn test_timezone_parse() {
        let tz: Timezone = "Europe/London".parse().unwrap();
        assert_eq!(tz.0.name(), "Europe/London");
        assert!("Mars/Olympus".parse::<Timezone>().is_err());
    }
}
