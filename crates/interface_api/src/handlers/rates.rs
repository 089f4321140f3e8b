//! Rate lookup and charge preview

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use core_kernel::Session;
use domain_ledger::EntryDraft;

use super::validated;
use crate::dto::employee_key;
use crate::dto::timesheet::{RateParams, RateResponse, TimesheetRequest, ValuationResponse};
use crate::{error::ApiError, AppState};

/// Hourly rate in force for an employee on a date
pub async fn resolve_rate(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(employee_id): Path<String>,
    Query(params): Query<RateParams>,
) -> Result<Json<RateResponse>, ApiError> {
    let id = employee_key(&employee_id)?;
    let date = params
        .date
        .unwrap_or_else(|| state.service.config().timezone.today());
    let hourly_rate = state.service.resolve_rate(&session, &id, date).await?;

    Ok(Json(RateResponse {
        employee_id: id.into_inner(),
        date,
        hourly_rate,
    }))
}

/// The charge an entry would be stored with
pub async fn valuate_entry(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<TimesheetRequest>,
) -> Result<Json<ValuationResponse>, ApiError> {
    let draft = EntryDraft::from(validated(request)?);
    let charge_out = state.service.valuate_entry(&session, &draft).await?;
    Ok(Json(ValuationResponse { charge_out }))
}
