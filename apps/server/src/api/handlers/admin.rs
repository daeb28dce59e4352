//! Health probes and audit trail handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::extractors::ValidatedQuery;
use crate::auth::Principal;
use crate::services::audit::AuditLogQuery;
use crate::{state::AppState, Result};

/// Process liveness. Does not touch dependencies.
pub async fn liveness() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Dependency health. Always 200; the body carries the verdict.
pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.health_service.check().await;
    (StatusCode::OK, Json(report)).into_response()
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedQuery(query): ValidatedQuery<AuditLogQuery>,
) -> Result<Response> {
    let result = state.audit_service.list(&principal, query).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}
