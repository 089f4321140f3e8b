//! Request and response bodies
//!
//! Query parameters and JSON bodies use camelCase field names. Request types
//! derive `Validate`; handlers validate before converting into ledger types.

pub mod timesheet;
pub mod employee;
pub mod client;
pub mod user;
pub mod audit;

use core_kernel::{ClientId, EmployeeId};

use crate::error::ApiError;

/// Treats blank query values as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) fn client_key(raw: &str) -> Result<ClientId, ApiError> {
    ClientId::parse(raw).map_err(|e| ApiError::Validation(format!("clientId: {}", e)))
}

pub(crate) fn employee_key(raw: &str) -> Result<EmployeeId, ApiError> {
    EmployeeId::parse(raw).map_err(|e| ApiError::Validation(format!("employeeId: {}", e)))
}
