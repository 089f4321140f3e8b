//! Client handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::Session;
use domain_ledger::{Client, ImportOutcome};

use super::validated;
use crate::dto::client::{CreateClientRequest, ImportClientsRequest, UpdateClientRequest};
use crate::dto::client_key;
use crate::{error::ApiError, AppState};

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.service.list_clients(&session).await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.service.get_client(&session, &client_key(&id)?).await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = validated(request)?.into_client()?;
    let created = state.service.create_client(&session, client).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Client>, ApiError> {
    let update = validated(request)?.into();
    let updated = state
        .service
        .update_client(&session, &client_key(&id)?, update)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_client(&session, &client_key(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn import_clients(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<ImportClientsRequest>,
) -> Result<Json<ImportOutcome>, ApiError> {
    Ok(Json(state.service.import_clients(&session, &request.rows).await?))
}
