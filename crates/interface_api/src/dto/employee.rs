//! Employee DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use domain_ledger::{Employee, EmployeeUpdate};

use super::employee_key;
use crate::error::ApiError;

fn non_negative(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() {
        return Err(ValidationError::new("negative_rate"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 50))]
    pub employee_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "non_negative"))]
    pub hourly_rate: Decimal,
}

impl CreateEmployeeRequest {
    pub fn into_employee(self) -> Result<Employee, ApiError> {
        Ok(Employee::new(employee_key(&self.employee_id)?, self.name, self.hourly_rate))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "non_negative"))]
    pub hourly_rate: Decimal,
}

impl From<UpdateEmployeeRequest> for EmployeeUpdate {
    fn from(request: UpdateEmployeeRequest) -> Self {
        EmployeeUpdate {
            name: request.name,
            hourly_rate: request.hourly_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_rate_is_rejected() {
        let request = UpdateEmployeeRequest {
            name: "Ann".to_string(),
            hourly_rate: dec!(-1),
        };
        assert!(request.validate().is_err());
    }
}
