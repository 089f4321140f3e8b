//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_ledger::LedgerError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone()),
            ApiError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone()),
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Conflict { message } => ApiError::Conflict(message),
            PortError::Validation { message, .. } => ApiError::Validation(message),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            LedgerError::Conflict(message) => ApiError::Conflict(message),
            LedgerError::PermissionDenied(denied) => ApiError::Forbidden(denied.to_string()),
            LedgerError::Persistence(port) => port.into(),
            LedgerError::AuditWriteFailure(message) => ApiError::Internal(message),
            LedgerError::InvalidDate(_)
            | LedgerError::InvalidTimeValue(_)
            | LedgerError::ClientNotFound(_)
            | LedgerError::MissingEmployeeId
            | LedgerError::RateUnavailable { .. }
            | LedgerError::InvalidComputedCharge
            | LedgerError::Validation(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::Unauthorized
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Capability, Role, CapabilitySet, Session};

    #[test]
    fn test_ledger_errors_map_to_statuses() {
        let cases = vec![
            (LedgerError::not_found("Client", "C9"), StatusCode::NOT_FOUND),
            (LedgerError::Conflict("Client ID C1 already exists".into()), StatusCode::CONFLICT),
            (LedgerError::InvalidComputedCharge, StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::ClientNotFound("C9".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::Persistence(PortError::connection("down")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_permission_denied_is_forbidden() {
        let session = Session::new("clerk", Role::Normal, CapabilitySet::read_only());
        let denied = session.require(Capability::Delete).unwrap_err();
        let response = ApiError::from(LedgerError::from(denied)).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
