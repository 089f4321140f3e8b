//! Timesheet handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::{EntryId, Session};
use domain_ledger::{read_csv_rows, Balance, EntryDraft, ImportOutcome, StoredEntry, TimesheetPage};

use super::validated;
use crate::dto::client_key;
use crate::dto::timesheet::{
    ImportTimesheetsRequest, PeriodParams, ScopeParams, TimesheetListParams, TimesheetRequest,
};
use crate::{error::ApiError, AppState};

fn entry_id(raw: &str) -> Result<EntryId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid timesheet id: {}", raw)))
}

/// Lists entries newest first, one page at a time
pub async fn list_timesheets(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<TimesheetListParams>,
) -> Result<Json<TimesheetPage>, ApiError> {
    let query = validated(params)?.into_query()?;
    Ok(Json(state.service.list_timesheets(&session, &query).await?))
}

pub async fn create_timesheet(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<TimesheetRequest>,
) -> Result<(StatusCode, Json<StoredEntry>), ApiError> {
    let draft = EntryDraft::from(validated(request)?);
    let stored = state.service.create_timesheet(&session, &draft).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn update_timesheet(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<TimesheetRequest>,
) -> Result<Json<StoredEntry>, ApiError> {
    let draft = EntryDraft::from(validated(request)?);
    let stored = state.service.update_timesheet(&session, entry_id(&id)?, &draft).await?;
    Ok(Json(stored))
}

pub async fn delete_timesheet(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_timesheet(&session, entry_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Imports JSON rows; rejected rows are reported, never fatal
pub async fn import_timesheets(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<ImportTimesheetsRequest>,
) -> Result<Json<ImportOutcome>, ApiError> {
    Ok(Json(state.service.import_timesheets(&session, &request.rows).await?))
}

/// Imports a CSV document sent as the request body
pub async fn import_timesheets_csv(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: String,
) -> Result<Json<ImportOutcome>, ApiError> {
    let rows = read_csv_rows(body.as_bytes())?;
    Ok(Json(state.service.import_timesheets(&session, &rows).await?))
}

pub async fn balance(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<ScopeParams>,
) -> Result<Json<Balance>, ApiError> {
    let scope = params.into_scope()?;
    Ok(Json(state.service.balance(&session, &scope).await?))
}

/// A client's entries oldest first
pub async fn client_timesheets(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(client_id): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Vec<StoredEntry>>, ApiError> {
    let id = client_key(&client_id)?;
    let entries = state
        .service
        .timesheets_for_client(&session, &id, params.bounds())
        .await?;
    Ok(Json(entries))
}
