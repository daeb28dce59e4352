//! Staff account handlers (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shorouk_models::{CreateUserRequest, UpdateUserRequest};

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::auth::Principal;
use crate::services::{parse_path_id, users::UserListQuery};
use crate::{state::AppState, Result};

pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<Response> {
    let user = state.user_service.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedQuery(query): ValidatedQuery<UserListQuery>,
) -> Result<Response> {
    let result = state.user_service.list(&principal, query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("User", &id)?;
    let user = state.user_service.get(&principal, id).await?;
    Ok((StatusCode::OK, Json(user)).into_response())
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Response> {
    let id = parse_path_id("User", &id)?;
    let user = state.user_service.update(&principal, id, request).await?;
    Ok((StatusCode::OK, Json(user)).into_response())
}
