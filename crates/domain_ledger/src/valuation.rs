//! Entry valuation
//!
//! Works out the signed charge for a draft according to its entry type:
//!
//! | Entry type | Charge supplied      | Charge stored              |
//! |------------|----------------------|----------------------------|
//! | Normal     | no                   | `round(rate × hours)`, > 0 |
//! | Normal     | yes                  | as supplied                |
//! | Close-off  | yes                  | `-abs(supplied)`           |
//! | Transfer   | yes                  | as supplied, either sign   |
//!
//! A supplied charge of zero counts as no charge.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::{round_charge, EmployeeId};

use crate::entry::{EntryDraft, EntryKind, EntryType};
use crate::error::{LedgerError, LedgerResult};
use crate::fraction::parse_fraction;
use crate::rate::RateResolver;

/// Charge for billable time at `rate`.
///
/// Checks run in a fixed order so the first failing precondition names the
/// problem: the rate, then the time value, then the computed charge.
pub fn charge_for_time(
    employee_id: &EmployeeId,
    date: NaiveDate,
    rate: Decimal,
    time_spent: &str,
) -> LedgerResult<Decimal> {
    if rate <= Decimal::ZERO {
        return Err(LedgerError::RateUnavailable {
            employee_id: employee_id.clone(),
            date,
        });
    }

    let hours = parse_fraction(time_spent);
    if hours <= Decimal::ZERO {
        return Err(LedgerError::InvalidTimeValue(time_spent.trim().to_string()));
    }

    let charge = rate
        .checked_mul(hours)
        .map(round_charge)
        .ok_or(LedgerError::InvalidComputedCharge)?;
    if charge <= Decimal::ZERO {
        return Err(LedgerError::InvalidComputedCharge);
    }
    Ok(charge)
}

/// Applies the sign convention of `entry_type` to a caller-supplied charge
pub fn signed_charge(entry_type: EntryType, supplied: Decimal) -> Decimal {
    match entry_type {
        EntryType::CloseOff => -supplied.abs(),
        EntryType::Normal | EntryType::Transfer => supplied,
    }
}

/// The outcome of valuing a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation {
    pub kind: EntryKind,
    pub charge_out: Decimal,
}

/// Values drafts, resolving employee rates when a charge must be derived
#[derive(Clone)]
pub struct EntryValuator {
    rates: RateResolver,
    close_off_marker: String,
}

impl EntryValuator {
    pub fn new(rates: RateResolver, close_off_marker: impl Into<String>) -> Self {
        Self {
            rates,
            close_off_marker: close_off_marker.into(),
        }
    }

    pub fn rates(&self) -> &RateResolver {
        &self.rates
    }

    /// Values one draft.
    ///
    /// Close-off and Transfer drafts must carry a charge; there is nothing to
    /// derive one from.
    pub async fn valuate(&self, draft: &EntryDraft) -> LedgerResult<Valuation> {
        let kind = draft.kind(&self.close_off_marker)?;

        let charge_out = match (&kind, draft.supplied_charge()) {
            (_, Some(supplied)) => signed_charge(draft.entry_type, supplied),
            (EntryKind::Normal { employee_id: None }, None) => return Err(LedgerError::MissingEmployeeId),
            (EntryKind::Normal { employee_id: Some(employee_id) }, None) => {
                let rate = self.rates.resolve(employee_id, draft.date).await?;
                let charge = charge_for_time(employee_id, draft.date, rate, &draft.time_spent)?;
                debug!(employee_id = %employee_id, %rate, %charge, "Derived charge from rate");
                charge
            }
            (_, None) => {
                return Err(LedgerError::validation(format!(
                    "Charge out is required for {} entries",
                    draft.entry_type
                )))
            }
        };

        Ok(Valuation { kind, charge_out })
    }
}
