//! Audit trail handler

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use core_kernel::Session;
use domain_ledger::AuditFact;

use super::validated;
use crate::dto::audit::AuditLogParams;
use crate::{error::ApiError, AppState};

/// Stored audit facts, newest first
pub async fn audit_log(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<AuditLogParams>,
) -> Result<Json<Vec<AuditFact>>, ApiError> {
    let query = validated(params)?.into();
    Ok(Json(state.service.audit_log(&session, &query).await?))
}
