//! Custom Test Assertions
//!
//! Assertion helpers that print the ledger values involved on failure.

use rust_decimal::Decimal;

use domain_ledger::{Balance, EntryType, ImportOutcome, TimesheetEntry};

/// Asserts `displayed == carry_forward + period_total`
pub fn assert_balance_consistent(balance: &Balance) {
    assert_eq!(
        balance.displayed,
        balance.carry_forward + balance.period_total,
        "Displayed balance {} is not carry-forward {} plus period total {}",
        balance.displayed,
        balance.carry_forward,
        balance.period_total
    );
}

pub fn assert_balance(balance: &Balance, carry_forward: Decimal, period_total: Decimal) {
    assert_eq!(balance.carry_forward, carry_forward, "carry-forward");
    assert_eq!(balance.period_total, period_total, "period total");
    assert_balance_consistent(balance);
}

/// Asserts a Close-off entry never increases the balance
pub fn assert_close_off_non_positive(entry: &TimesheetEntry) {
    if entry.entry_type() == EntryType::CloseOff {
        assert!(
            entry.charge_out <= Decimal::ZERO,
            "Close-off entry on {} stored a positive charge {}",
            entry.date,
            entry.charge_out
        );
    }
}

/// Asserts every row imported
pub fn assert_import_clean(outcome: &ImportOutcome, expected_rows: usize) {
    assert!(outcome.errors.is_empty(), "Unexpected import errors: {:?}", outcome.errors);
    assert_eq!(outcome.success_count, expected_rows, "imported row count");
}

/// Asserts the outcome reports `message` for the 1-based `row`
pub fn assert_row_error(outcome: &ImportOutcome, row: usize, message: &str) {
    let expected = format!("Row {}: {}", row, message);
    assert!(
        outcome.errors.iter().any(|e| e == &expected),
        "Expected error {:?}, got {:?}",
        expected,
        outcome.errors
    );
}
