//! User account handlers (admin only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::Session;
use domain_ledger::UserAccount;

use super::validated;
use crate::dto::user::UserRequest;
use crate::{error::ApiError, AppState};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<UserAccount>>, ApiError> {
    Ok(Json(state.service.list_users(&session).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserAccount>), ApiError> {
    let user = validated(request)?.into();
    let created = state.service.create_user(&session, user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
    Json(request): Json<UserRequest>,
) -> Result<Json<UserAccount>, ApiError> {
    let user = validated(request)?.into();
    Ok(Json(state.service.update_user(&session, &username, user).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_user(&session, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
