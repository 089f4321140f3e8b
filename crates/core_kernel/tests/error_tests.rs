//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::{Capability, CapabilitySet, ClientId, Role, Session};

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("ZAR".to_string(), "EUR".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
}

#[test]
fn test_core_error_from_blank_key() {
    let core_error: CoreError = ClientId::parse("").unwrap_err().into();
    assert_eq!(core_error.to_string(), "Client ID must not be empty");
}

#[test]
fn test_core_error_from_permission_denied() {
    let session = Session::new("clerk", Role::Normal, CapabilitySet::none());
    let core_error: CoreError = session.require(Capability::View).unwrap_err().into();

    assert!(matches!(core_error, CoreError::PermissionDenied(_)));
    assert_eq!(core_error.to_string(), "Permission denied: clerk may not view");
}
