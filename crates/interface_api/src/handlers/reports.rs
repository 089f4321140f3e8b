//! Statement handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use core_kernel::Session;
use domain_ledger::Report;

use crate::dto::timesheet::PeriodParams;
use crate::dto::{client_key, employee_key};
use crate::{error::ApiError, AppState};

pub async fn client_report(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .service
        .client_report(&session, &client_key(&id)?, params.bounds())
        .await?;
    Ok(Json(report))
}

pub async fn employee_report(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .service
        .employee_report(&session, &employee_key(&id)?, params.bounds())
        .await?;
    Ok(Json(report))
}

/// One statement per client with activity, ordered by client name
pub async fn all_client_reports(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Vec<Report>>, ApiError> {
    Ok(Json(state.service.all_client_reports(&session, params.bounds()).await?))
}

pub async fn all_employee_reports(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Vec<Report>>, ApiError> {
    Ok(Json(state.service.all_employee_reports(&session, params.bounds()).await?))
}
