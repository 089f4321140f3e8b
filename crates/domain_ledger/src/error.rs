//! Ledger domain errors

use chrono::NaiveDate;
use core_kernel::{EmployeeId, EmptyKeyError, PermissionDenied, PortError};
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A date could not be normalized to a calendar date
    #[error("Invalid date format - {0}")]
    InvalidDate(String),

    /// A time value did not resolve to a positive number of hours
    #[error("Invalid time format - {0}")]
    InvalidTimeValue(String),

    /// No client matched the supplied reference
    #[error("Client not found - {0}")]
    ClientNotFound(String),

    /// A Normal entry needs an employee to value it
    #[error("Missing employee ID for charge-out calculation")]
    MissingEmployeeId,

    /// No positive rate is in force for the employee on the entry date
    #[error("No rate found for employee {employee_id} on {date}")]
    RateUnavailable {
        employee_id: EmployeeId,
        date: NaiveDate,
    },

    /// Rate × hours rounded to a non-positive charge
    #[error("Could not calculate charge-out. Check employee rate.")]
    InvalidComputedCharge,

    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// A record with the same key already exists
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PortError),

    /// Only ever logged; audit failures never fail the mutation
    #[error("Audit write failed: {0}")]
    AuditWriteFailure(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<EmptyKeyError> for LedgerError {
    fn from(error: EmptyKeyError) -> Self {
        LedgerError::Validation(error.to_string())
    }
}

/// Result alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
