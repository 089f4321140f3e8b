//! Monetary amounts and charge rounding
//!
//! Ledger charges are stored as signed decimals; `Money` pairs a decimal with
//! the firm's billing currency for display in summaries and reports.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Billing currencies, ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    ZAR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the currency symbol used in summaries
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::ZAR => "R",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::ZAR => "ZAR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ZAR" => Ok(Currency::ZAR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// Rounds a computed charge to whole currency units.
///
/// Midpoints round away from zero, so `round_charge(124.5) == 125`.
pub fn round_charge(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a caller-supplied amount such as `"1250"`, `"-50.5"` or `"R 1 250"`.
///
/// Currency symbols, spaces and thousands separators are ignored. Returns
/// `None` for empty or non-numeric input.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(|c: char| c.is_alphabetic() || c == '$' || c == '€' || c == '£')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// A monetary amount in a billing currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value, keeping at most 4 decimal places
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self {
            amount: self.amount.abs(),
            currency: self.currency,
        }
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Sums a sequence of decimal amounts into this currency
    pub fn sum<I>(amounts: I, currency: Currency) -> Self
    where
        I: IntoIterator<Item = Decimal>,
    {
        Self::new(amounts.into_iter().sum(), currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Whole amounts print without decimals, matching how charges are billed.
        if self.amount.fract().is_zero() {
            write!(f, "{}{}", self.currency.symbol(), self.amount.trunc())
        } else {
            write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
        }
    }
}

impl Add for Money {
    type Output = Result<Money, MoneyError>;

    fn add(self, other: Self) -> Self::Output {
        self.checked_add(&other)
    }
}

impl Sub for Money {
    type Output = Result<Money, MoneyError>;

    fn sub(self, other: Self) -> Self::Output {
        self.checked_sub(&other)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_charge_half_away_from_zero() {
        assert_eq!(round_charge(dec!(124.5)), dec!(125));
        assert_eq!(round_charge(dec!(124.49)), dec!(124));
        assert_eq!(round_charge(dec!(125.00)), dec!(125));
    }

    #[test]
    fn test_money_display_whole_and_fractional() {
        assert_eq!(Money::new(dec!(100), Currency::ZAR).to_string(), "R100");
        assert_eq!(Money::new(dec!(99.5), Currency::ZAR).to_string(), "R99.50");
        assert_eq!(Money::new(dec!(-50), Currency::USD).to_string(), "$-50");
    }

    #[test]
    fn test_currency_mismatch() {
        let zar = Money::new(dec!(100.00), Currency::ZAR);
        let eur = Money::new(dec!(100.00), Currency::EUR);

        let result = zar.checked_add(&eur);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("1250"), Some(dec!(1250)));
        assert_eq!(parse_amount(" -50.5 "), Some(dec!(-50.5)));
        assert_eq!(parse_amount("R 1,250"), Some(dec!(1250)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn round_charge_is_within_half_unit(minor in -10_000_000i64..10_000_000i64) {
            let value = Decimal::new(minor, 2);
            let rounded = round_charge(value);
            prop_assert!((rounded - value).abs() <= dec!(0.5));
            prop_assert!(rounded.fract().is_zero());
        }

        #[test]
        fn money_sum_matches_decimal_sum(values in proptest::collection::vec(-1_000_000i64..1_000_000i64, 0..20)) {
            let decimals: Vec<Decimal> = values.iter().map(|v| Decimal::new(*v, 2)).collect();
            let expected: Decimal = decimals.iter().copied().sum();
            prop_assert_eq!(Money::sum(decimals, Currency::ZAR).amount(), expected);
        }
    }
}
