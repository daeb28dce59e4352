//! Error type shared by the store, services and HTTP layer.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shorouk_models::FieldViolation;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldViolation>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Unique-constraint style conflicts (duplicate username, medical number).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidTransition(String),

    /// Workflow rules such as editing a submitted form.
    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(details: Vec<FieldViolation>) -> Self {
        Error::Validation {
            message: "Validation failed".to_string(),
            details,
        }
    }

    /// A single-field validation failure.
    pub fn invalid_field(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::validation(vec![FieldViolation::new(field, code, message)])
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("{entity} {id} not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Conflict(_) | Error::InvalidTransition(_) | Error::BusinessRule(_) => {
                StatusCode::CONFLICT
            }
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Vec<FieldViolation>> for Error {
    fn from(details: Vec<FieldViolation>) -> Self {
        Error::validation(details)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Error::Validation { message, details } => json!({
                "error": message,
                "details": details,
            }),
            Error::Database(e) => {
                tracing::error!(error = %e, "Database error");
                json!({ "error": "Internal server error" })
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
