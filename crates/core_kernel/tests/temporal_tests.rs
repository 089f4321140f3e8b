//! Tests for report windows, effective dating and the firm timezone

use chrono::{NaiveDate, TimeZone, Utc};
use core_kernel::{
    in_force_on, DateRange, EffectiveDated, PeriodBounds, TemporalError, Timezone,
    REPORT_CEILING, REPORT_FLOOR,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod ranges {
    use super::*;

    #[test]
    fn test_date_range_is_inclusive() {
        let feb = DateRange::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        assert!(feb.contains(date(2024, 2, 1)));
        assert!(feb.contains(date(2024, 2, 29)));
        assert!(!feb.contains(date(2024, 3, 1)));
        assert_eq!(feb.days(), 28);
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let result = DateRange::new(date(2024, 3, 1), date(2024, 2, 1));
        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_period_bounds_partial() {
        let from_feb = PeriodBounds::new(Some(date(2024, 2, 1)), None);
        assert!(from_feb.contains(date(2099, 1, 1)));
        assert!(!from_feb.contains(date(2024, 1, 31)));

        let range = from_feb.to_report_range();
        assert_eq!(range.start, date(2024, 2, 1));
        assert_eq!(range.end, REPORT_CEILING);
    }

    #[test]
    fn test_report_sentinels() {
        assert_eq!(REPORT_FLOOR.to_string(), "1900-01-01");
        assert_eq!(REPORT_CEILING.to_string(), "2100-12-31");
    }
}

mod effective_dating {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RateChange {
        from: NaiveDate,
        rate: u32,
    }

    impl EffectiveDated for RateChange {
        fn effective_date(&self) -> NaiveDate {
            self.from
        }
    }

    #[test]
    fn test_record_in_force_on_its_effective_date() {
        let history = vec![
            RateChange { from: date(2024, 1, 1), rate: 100 },
            RateChange { from: date(2024, 6, 1), rate: 150 },
        ];

        assert_eq!(in_force_on(&history, date(2024, 5, 31)).map(|r| r.rate), Some(100));
        assert_eq!(in_force_on(&history, date(2024, 6, 1)).map(|r| r.rate), Some(150));
        assert_eq!(in_force_on(&history, date(2025, 1, 1)).map(|r| r.rate), Some(150));
    }

    #[test]
    fn test_no_record_before_history_starts() {
        let history = vec![RateChange { from: date(2024, 1, 1), rate: 100 }];
        assert!(in_force_on(&history, date(2023, 6, 1)).is_none());
        assert!(in_force_on::<RateChange>(&[], date(2023, 6, 1)).is_none());
    }
}

mod timezone {
    use super::*;

    #[test]
    fn test_date_of_crosses_midnight_in_local_zone() {
        let tz: Timezone = "Africa/Johannesburg".parse().unwrap();
        // 23:30 UTC is already the next day in UTC+2
        let instant = Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap();
        assert_eq!(tz.date_of(instant), date(2024, 3, 1));
    }

    #[test]
    fn test_timezone_serde_uses_iana_name() {
        let tz: Timezone = serde_json::from_str("\"Europe/London\"").unwrap();
        assert_eq!(serde_json::to_string(&tz).unwrap(), "\"Europe/London\"");
        assert!(serde_json::from_str::<Timezone>("\"Nowhere/Else\"").is_err());
    }
}
