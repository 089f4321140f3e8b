//! Employee handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::Session;
use domain_ledger::{Employee, RateHistoryRecord};

use super::validated;
use crate::dto::employee::{CreateEmployeeRequest, UpdateEmployeeRequest};
use crate::dto::employee_key;
use crate::{error::ApiError, AppState};

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(state.service.list_employees(&session).await?))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<Employee>, ApiError> {
    Ok(Json(state.service.get_employee(&session, &employee_key(&id)?).await?))
}

pub async fn create_employee(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let employee = validated(request)?.into_employee()?;
    let created = state.service.create_employee(&session, employee).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Updates name and rate; a rate change is appended to the history
pub async fn update_employee(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> Result<Json<Employee>, ApiError> {
    let update = validated(request)?.into();
    let updated = state
        .service
        .update_employee(&session, &employee_key(&id)?, update)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_employee(&session, &employee_key(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rate history, most recent effective date first
pub async fn rate_history(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RateHistoryRecord>>, ApiError> {
    Ok(Json(state.service.rate_history(&session, &employee_key(&id)?).await?))
}
