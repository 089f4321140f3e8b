//! Quarter-hour time notation
//!
//! Timesheets record time as quarter-hour tokens: `¼ ½ ¾ 1 1¼ … 7¾ 8`.
//! This module converts between those tokens and decimal hours.
//!
//! # Example
//!
//! ```rust
//! use domain_ledger::fraction::{parse_fraction, to_fraction_token};
//! use rust_decimal_macros::dec;
//!
//! assert_eq!(parse_fraction("1½"), dec!(1.5));
//! assert_eq!(to_fraction_token(dec!(0.5)), "½");
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

const QUARTER_GLYPHS: [&str; 4] = ["", "¼", "½", "¾"];

/// Largest vocabulary entry, in quarter hours (8 hours)
const MAX_QUARTERS: u32 = 32;

/// How far a fractional part may sit from a quarter and still snap to it
const SNAP_TOLERANCE: Decimal = dec!(0.01);

fn token_for_quarters(quarters: u32) -> String {
    let whole = quarters / 4;
    let glyph = QUARTER_GLYPHS[(quarters % 4) as usize];
    if whole == 0 {
        glyph.to_string()
    } else {
        format!("{}{}", whole, glyph)
    }
}

/// The quarter-hour vocabulary in ascending order, paired with decimal hours
pub fn vocabulary() -> impl Iterator<Item = (String, Decimal)> {
    (1..=MAX_QUARTERS).map(|q| (token_for_quarters(q), Decimal::new(q as i64 * 25, 2)))
}

fn vocabulary_value(token: &str) -> Option<Decimal> {
    vocabulary().find(|(t, _)| t == token).map(|(_, hours)| hours)
}

/// Returns true if `token` is one of the quarter-hour vocabulary tokens
pub fn is_vocabulary_token(token: &str) -> bool {
    vocabulary_value(token).is_some()
}

/// Reads the leading decimal number of `raw`, ignoring trailing text.
///
/// `"1.5h"` reads as 1.5 and `".25"` as 0.25; input without leading digits
/// yields `None`.
fn leading_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim_start();
    let mut chars = s.chars().peekable();
    let mut sign = "";
    if let Some(&c) = chars.peek() {
        if c == '-' || c == '+' {
            sign = if c == '-' { "-" } else { "" };
            chars.next();
        }
    }

    let mut int_part = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            int_part.push(c);
            chars.next();
        } else {
            break;
        }
    }

    let mut frac_part = String::new();
    if chars.peek() == Some(&'.') {
        chars.next();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                frac_part.push(c);
                chars.next();
            } else {
                break;
            }
        }
    }

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if int_part.is_empty() {
        int_part.push('0');
    }

    let literal = if frac_part.is_empty() {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    };
    Decimal::from_str(&literal).ok()
}

/// Converts a time token to decimal hours.
///
/// Resolution order:
/// 1. a token containing `/` is read as numerator/denominator from its first two parts
/// 2. a vocabulary token maps to its hours
/// 3. otherwise the leading decimal number is used
///
/// Anything unparseable, including a zero denominator, yields 0. Negative
/// numbers pass through; callers decide whether non-positive time is valid.
pub fn parse_fraction(token: &str) -> Decimal {
    let token = token.trim();

    if token.contains('/') {
        let mut parts = token.split('/');
        let numerator = parts.next().and_then(leading_decimal);
        let denominator = parts.next().and_then(leading_decimal);
        return match (numerator, denominator) {
            (Some(n), Some(d)) => n.checked_div(d).unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        };
    }

    vocabulary_value(token)
        .or_else(|| leading_decimal(token))
        .unwrap_or(Decimal::ZERO)
}

/// Renders decimal hours as a time token.
///
/// The whole part is kept and a fractional part within 0.01 of ¼, ½ or ¾ is
/// replaced by the glyph; a fractional part under 0.01 is dropped. Any other
/// value renders as a plain decimal (`0.33` → `"0.33"`). Non-positive hours
/// render as `"0"`.
pub fn to_fraction_token(hours: Decimal) -> String {
    if hours <= Decimal::ZERO {
        return "0".to_string();
    }

    let whole = hours.trunc().normalize();
    let remainder = hours - whole;

    if remainder < SNAP_TOLERANCE {
        return whole.to_string();
    }

    for (quarter, glyph) in [(dec!(0.25), "¼"), (dec!(0.5), "½"), (dec!(0.75), "¾")] {
        if (remainder - quarter).abs() < SNAP_TOLERANCE {
            return if whole.is_zero() {
                glyph.to_string()
            } else {
                format!("{}{}", whole, glyph)
            };
        }
    }

    hours.normalize().to_string()
}

/// Canonicalizes a caller-supplied time value into the token stored on an entry.
///
/// Vocabulary tokens pass through untouched; anything else is parsed with
/// [`parse_fraction`] and re-rendered. Returns `None` when the value does not
/// amount to positive time.
pub fn canonical_time_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_vocabulary_token(trimmed) {
        return Some(trimmed.to_string());
    }

    match to_fraction_token(parse_fraction(trimmed)) {
        token if token == "0" => None,
        token => Some(token),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn vocabulary_round_trips(q in 1u32..=32) {
            let token = token_for_quarters(q);
            prop_assert_eq!(to_fraction_token(parse_fraction(&token)), token);
        }

        #[test]
        fn token_hours_stay_within_tolerance(minor in 1i64..8_000) {
            let hours = Decimal::new(minor, 3);
            let token = to_fraction_token(hours);
            prop_assert!((parse_fraction(&token) - hours).abs() < SNAP_TOLERANCE);
        }
    }
}
