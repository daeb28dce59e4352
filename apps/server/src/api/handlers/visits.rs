//! Visit handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shorouk_models::{CreateVisitRequest, StatusChangeRequest};

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::auth::Principal;
use crate::services::{parse_path_id, visits::VisitListQuery};
use crate::{state::AppState, Result};

pub async fn create_visit(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<CreateVisitRequest>,
) -> Result<Response> {
    let visit = state.visit_service.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(visit)).into_response())
}

pub async fn list_visits(
    State(state): State<AppState>,
    _principal: Principal,
    ValidatedQuery(query): ValidatedQuery<VisitListQuery>,
) -> Result<Response> {
    let result = state.visit_service.list(query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

pub async fn get_visit(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("Visit", &id)?;
    let visit = state.visit_service.get(id).await?;
    Ok((StatusCode::OK, Json(visit)).into_response())
}

pub async fn change_visit_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<StatusChangeRequest>,
) -> Result<Response> {
    let id = parse_path_id("Visit", &id)?;
    let visit = state
        .visit_service
        .change_status(&principal, id, request)
        .await?;
    Ok((StatusCode::OK, Json(visit)).into_response())
}
