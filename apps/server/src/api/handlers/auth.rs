//! Authentication handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::extractors::ValidatedJson;
use crate::auth::Principal;
use crate::services::auth::{LoginRequest, RefreshRequest};
use crate::{state::AppState, Result};

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Response> {
    let response = state.auth_service.login(request).await?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<Response> {
    let tokens = state.auth_service.refresh(request).await?;
    Ok((StatusCode::OK, Json(tokens)).into_response())
}

pub async fn me(State(state): State<AppState>, principal: Principal) -> Result<Response> {
    let user = state.auth_service.me(&principal).await?;
    Ok((StatusCode::OK, Json(user)).into_response())
}
