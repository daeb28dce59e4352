//! Request extractors with API-shaped rejections.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use shorouk_models::FieldViolation;

use crate::Error;

/// `Json<T>` whose rejections use the API error envelope: malformed JSON is a
/// 400, a well-formed body of the wrong shape is a 422, and a missing
/// `application/json` content type is a 415.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(map_rejection(rejection)),
        }
    }
}

/// `Query<T>` whose rejections use the API error envelope. A query string
/// that does not fit `T` is a 422 on field `query`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ValidatedQuery(value)),
            Err(rejection) => Err(map_query_rejection(rejection)),
        }
    }
}

fn map_query_rejection(rejection: QueryRejection) -> Error {
    match rejection {
        QueryRejection::FailedToDeserializeQueryString(e) => {
            let text = e.body_text();
            let message = text
                .split_once(": ")
                .map_or(text.as_str(), |(_, detail)| detail);
            Error::validation(vec![FieldViolation::new(
                "query",
                "type",
                format!("Invalid query string: {message}"),
            )])
        }
        other => Error::BadRequest(other.body_text()),
    }
}

/// Turns a JSON data error into a violation on the offending field. The
/// rejection text reads `<prefix>: <path>: <reason>`, where the path is
/// absent for errors at the document root.
fn data_error_violation(text: &str) -> FieldViolation {
    let detail = text.split_once(": ").map_or(text, |(_, detail)| detail);
    match detail.split_once(": ") {
        Some((path, reason)) if is_field_path(path) => FieldViolation::new(path, "type", reason),
        _ => FieldViolation::new("body", "type", detail),
    }
}

fn is_field_path(candidate: &str) -> bool {
    candidate != "."
        && !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

fn map_rejection(rejection: JsonRejection) -> Error {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            Error::validation(vec![data_error_violation(&e.body_text())])
        }
        JsonRejection::JsonSyntaxError(e) => {
            Error::BadRequest(format!("Malformed JSON: {}", e.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => Error::UnsupportedMediaType(
            "Expected request with `Content-Type: application/json`".to_string(),
        ),
        other => Error::BadRequest(other.body_text()),
    }
}
