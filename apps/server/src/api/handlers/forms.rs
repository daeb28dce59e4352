//! Nurse and doctor form handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shorouk_models::{
    CreateDoctorFormRequest, CreateNurseFormRequest, UpdateDoctorFormRequest,
    UpdateNurseFormRequest,
};

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::auth::Principal;
use crate::services::{forms::FormListQuery, parse_path_id};
use crate::{state::AppState, Result};

pub async fn create_nurse_form(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<CreateNurseFormRequest>,
) -> Result<Response> {
    let form = state
        .form_service
        .create_nurse_form(&principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(form)).into_response())
}

pub async fn list_nurse_forms(
    State(state): State<AppState>,
    _principal: Principal,
    ValidatedQuery(query): ValidatedQuery<FormListQuery>,
) -> Result<Response> {
    let result = state.form_service.list_nurse_forms(query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

pub async fn get_nurse_form(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("Nurse form", &id)?;
    let form = state.form_service.get_nurse_form(id).await?;
    Ok((StatusCode::OK, Json(form)).into_response())
}

pub async fn update_nurse_form(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateNurseFormRequest>,
) -> Result<Response> {
    let id = parse_path_id("Nurse form", &id)?;
    let form = state
        .form_service
        .update_nurse_form(&principal, id, request)
        .await?;
    Ok((StatusCode::OK, Json(form)).into_response())
}

pub async fn submit_nurse_form(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("Nurse form", &id)?;
    let form = state.form_service.submit_nurse_form(&principal, id).await?;
    Ok((StatusCode::OK, Json(form)).into_response())
}

pub async fn create_doctor_form(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<CreateDoctorFormRequest>,
) -> Result<Response> {
    let form = state
        .form_service
        .create_doctor_form(&principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(form)).into_response())
}

pub async fn list_doctor_forms(
    State(state): State<AppState>,
    _principal: Principal,
    ValidatedQuery(query): ValidatedQuery<FormListQuery>,
) -> Result<Response> {
    let result = state.form_service.list_doctor_forms(query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

pub async fn get_doctor_form(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("Doctor form", &id)?;
    let form = state.form_service.get_doctor_form(id).await?;
    Ok((StatusCode::OK, Json(form)).into_response())
}

pub async fn update_doctor_form(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateDoctorFormRequest>,
) -> Result<Response> {
    let id = parse_path_id("Doctor form", &id)?;
    let form = state
        .form_service
        .update_doctor_form(&principal, id, request)
        .await?;
    Ok((StatusCode::OK, Json(form)).into_response())
}

pub async fn submit_doctor_form(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_path_id("Doctor form", &id)?;
    let form = state
        .form_service
        .submit_doctor_form(&principal, id)
        .await?;
    Ok((StatusCode::OK, Json(form)).into_response())
}
