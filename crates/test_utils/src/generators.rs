//! Property-Based Test Generators
//!
//! Proptest strategies for ledger values.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_ledger::fraction::vocabulary;
use domain_ledger::{EntryType, TimesheetEntry};

use crate::builders::TestEntryBuilder;

/// Any token from the quarter-hour vocabulary
pub fn fraction_token_strategy() -> impl Strategy<Value = String> {
    let tokens: Vec<String> = vocabulary().map(|(token, _)| token).collect();
    prop::sample::select(tokens)
}

/// Whole quarter hours from ¼ to 8
pub fn quarter_hours_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=32).prop_map(|q| Decimal::new(q * 25, 2))
}

/// Hourly rates from 1.00 to 5000.00
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..500_000).prop_map(|minor| Decimal::new(minor, 2))
}

/// Signed charges in cents
pub fn charge_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000).prop_map(|minor| Decimal::new(minor, 2))
}

/// Dates within 2023 and 2024
pub fn ledger_date_strategy() -> impl Strategy<Value = NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    (0i64..731).prop_map(move |days| base + Duration::days(days))
}

pub fn entry_type_strategy() -> impl Strategy<Value = EntryType> {
    prop_oneof![
        Just(EntryType::Normal),
        Just(EntryType::CloseOff),
        Just(EntryType::Transfer),
    ]
}

/// Normal entries for C1 or C2 with arbitrary signed charges
pub fn entry_strategy() -> impl Strategy<Value = TimesheetEntry> {
    (ledger_date_strategy(), prop::bool::ANY, charge_strategy()).prop_map(|(date, second, charge)| {
        TestEntryBuilder::new()
            .on(date)
            .for_client(if second { "C2" } else { "C1" })
            .charge(charge)
            .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::{parse_fraction, to_fraction_token};

    proptest! {
        #[test]
        fn vocabulary_tokens_survive_the_codec(token in fraction_token_strategy()) {
            prop_assert_eq!(to_fraction_token(parse_fraction(&token)), token);
        }

        #[test]
        fn quarter_hours_have_tokens(hours in quarter_hours_strategy()) {
            prop_assert_eq!(parse_fraction(&to_fraction_token(hours)), hours);
        }
    }
}
