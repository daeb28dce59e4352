//! Patient handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shorouk_models::PatientRequest;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::auth::Principal;
use crate::services::{
    parse_path_id,
    patients::{PageQuery, PatientListQuery},
};
use crate::{state::AppState, Result};

pub async fn create_patient(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<PatientRequest>,
) -> Result<Response> {
    let patient = state.patient_service.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(patient)).into_response())
}

pub async fn list_patients(
    State(state): State<AppState>,
    _principal: Principal,
    ValidatedQuery(query): ValidatedQuery<PatientListQuery>,
) -> Result<Response> {
    let result = state.patient_service.list(query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

pub async fn get_patient(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("Patient", &id)?;
    let patient = state.patient_service.get(id).await?;
    Ok((StatusCode::OK, Json(patient)).into_response())
}

pub async fn update_patient(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<PatientRequest>,
) -> Result<Response> {
    let id = parse_path_id("Patient", &id)?;
    let patient = state
        .patient_service
        .update(&principal, id, request)
        .await?;
    Ok((StatusCode::OK, Json(patient)).into_response())
}

pub async fn list_patient_visits(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Response> {
    let id = parse_path_id("Patient", &id)?;
    let result = state.patient_service.visits(id, query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}
