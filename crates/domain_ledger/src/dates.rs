//! Date normalization for externally-sourced rows
//!
//! Imported spreadsheets carry dates in whatever shape the source system
//! produced. [`normalize_date`] tries each accepted shape in a fixed order and
//! yields a calendar date, or `None` when nothing matches.
//!
//! Both slash and dot forms are read day-first. A slash-only form that some
//! sources emit month-first (US style) is still read day-first so that every
//! import agrees with the firm's convention; it is kept as its own rule so the
//! convention can be revisited in one place.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

/// Serial numbers above this are read as spreadsheet day counts
const SPREADSHEET_SERIAL_FLOOR: f64 = 40_000.0;

/// Largest serial a spreadsheet can represent (9999-12-31)
const SPREADSHEET_SERIAL_CEILING: f64 = 2_958_465.0;

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01
const SPREADSHEET_UNIX_OFFSET: f64 = 25_569.0;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%a %b %d %Y",
];

/// Normalizes a raw date cell into a calendar date.
///
/// Rules, tried in order:
/// 1. `YYYY-MM-DD`
/// 2. `D.M.YYYY` or `D/M/YYYY`, day first
/// 3. `D/M/YYYY` written month-first by the source, still read day first
/// 4. a number above 40000, read as a spreadsheet serial day count (UTC)
/// 5. common calendar strings (`2024/03/05`, `March 5, 2024`, RFC 3339, ...)
///
/// Shapes that match a rule but name an impossible day (`31.02.2024`) are
/// rejected rather than passed on.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if is_iso_shape(s) {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    }

    if let Some((day, month, year)) = split_day_month_year(s, &['.', '/']) {
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some((day, month, year)) = split_day_month_year(s, &['/']) {
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(date) = from_spreadsheet_serial(s) {
        return Some(date);
    }

    parse_calendar_string(s)
}

/// Rewrites a legacy stored date (`D.M.YYYY` or `D/M/YYYY`) to a calendar date.
///
/// Only the day-first legacy shapes are recognised; anything else, including
/// values already in ISO form, returns `None` and is left alone by migration.
pub fn migrate_legacy_date(stored: &str) -> Option<NaiveDate> {
    let (day, month, year) = split_day_month_year(stored.trim(), &['.', '/'])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn is_iso_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

/// Splits `D?D<sep>M?M<sep>YYYY`, where each separator is any of `separators`
fn split_day_month_year(s: &str, separators: &[char]) -> Option<(u32, u32, i32)> {
    let mut parts = s.split(|c: char| separators.contains(&c));
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(day) && all_digits(month) && all_digits(year)) {
        return None;
    }
    if day.len() > 2 || month.len() > 2 || year.len() != 4 {
        return None;
    }

    Some((day.parse().ok()?, month.parse().ok()?, year.parse().ok()?))
}

fn from_spreadsheet_serial(s: &str) -> Option<NaiveDate> {
    let serial: f64 = s.parse().ok()?;
    if !serial.is_finite() || serial <= SPREADSHEET_SERIAL_FLOOR || serial > SPREADSHEET_SERIAL_CEILING {
        return None;
    }

    // Fractional serials carry a time of day; the calendar day is the floor.
    let days_since_unix_epoch = (serial - SPREADSHEET_UNIX_OFFSET).floor() as u64;
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_days(Days::new(days_since_unix_epoch))
}

fn parse_calendar_string(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_passes_through() {
        assert_eq!(normalize_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date(" 2024-03-05 "), Some(date(2024, 3, 5)));
    }

    #[test]
    fn test_day_first_dot_and_slash() {
        assert_eq!(normalize_date("05.03.2024"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("5.3.2024"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("5.3/2024"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn test_impossible_calendar_days_rejected() {
        assert_eq!(normalize_date("31.02.2024"), None);
        assert_eq!(normalize_date("2024-13-01"), None);
        // month-first reading would be valid, day-first is not
        assert_eq!(normalize_date("03/25/2024"), None);
    }

    #[test]
    fn test_spreadsheet_serial() {
        assert_eq!(normalize_date("45356"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("45356.75"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("40000"), None);
        assert_eq!(normalize_date("12"), None);
    }

    #[test]
    fn test_calendar_strings() {
        assert_eq!(normalize_date("2024/03/05"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("March 5, 2024"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("5 Mar 2024"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("2024-03-05T10:30:00"), Some(date(2024, 3, 5)));
        assert_eq!(normalize_date("2024-03-05T23:30:00+02:00"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(normalize_date("not-a-date"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("NaN"), None);
        assert_eq!(normalize_date("inf"), None);
    }

    #[test]
    fn test_migrate_legacy_date() {
        assert_eq!(migrate_legacy_date("5.3.2024"), Some(date(2024, 3, 5)));
        assert_eq!(migrate_legacy_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(migrate_legacy_date("2024-03-05"), None);
        assert_eq!(migrate_legacy_date("March 5, 2024"), None);
    }
}
