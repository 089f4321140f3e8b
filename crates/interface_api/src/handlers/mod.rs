//! Request handlers, one module per resource

pub mod health;
pub mod rates;
pub mod timesheets;
pub mod employees;
pub mod clients;
pub mod reports;
pub mod users;
pub mod audit;

use validator::Validate;

use crate::error::ApiError;

/// Runs derived validation on a request body or query
pub(crate) fn validated<T: Validate>(value: T) -> Result<T, ApiError> {
    value.validate()?;
    Ok(value)
}
