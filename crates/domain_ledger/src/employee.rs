//! Employees and their pay-rate history

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{EffectiveDated, EmployeeId};

use crate::error::LedgerError;

/// An employee whose time is billed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_id: EmployeeId,
    pub name: String,
    /// Current hourly rate, used when no history record applies
    pub hourly_rate: Decimal,
}

impl Employee {
    pub fn new(employee_id: EmployeeId, name: impl Into<String>, hourly_rate: Decimal) -> Self {
        Self {
            employee_id,
            name: name.into(),
            hourly_rate,
        }
    }

    /// Checks the fields a caller can supply
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("Employee name must not be empty"));
        }
        if self.hourly_rate.is_sign_negative() {
            return Err(LedgerError::validation(format!(
                "Hourly rate must not be negative: {}",
                self.hourly_rate
            )));
        }
        Ok(())
    }
}

/// An hourly rate taking effect on a date
///
/// History is append-only: one record is written when the employee is
/// created and another whenever the rate changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateHistoryRecord {
    pub employee_id: EmployeeId,
    pub hourly_rate: Decimal,
    pub effective_date: NaiveDate,
}

impl RateHistoryRecord {
    pub fn new(employee_id: EmployeeId, hourly_rate: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            employee_id,
            hourly_rate,
            effective_date,
        }
    }
}

impl EffectiveDated for RateHistoryRecord {
    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }
}

/// Changes to an existing employee; the key itself is fixed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub name: String,
    pub hourly_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_employee_validation() {
        let id = EmployeeId::parse("E1").unwrap();
        assert!(Employee::new(id.clone(), "Ann", dec!(100)).validate().is_ok());
        assert!(Employee::new(id.clone(), " ", dec!(100)).validate().is_err());
        assert!(Employee::new(id, "Ann", dec!(-1)).validate().is_err());
    }

    #[test]
    fn test_employee_serializes_with_schema_names() {
        let employee = Employee::new(EmployeeId::parse("E1").unwrap(), "Ann", dec!(80));
        let json = serde_json::to_value(&employee).unwrap();
        assert_eq!(json["employeeId"], "E1");
        assert_eq!(json["hourlyRate"], "80");
    }
}
