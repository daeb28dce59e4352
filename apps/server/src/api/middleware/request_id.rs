//! Request correlation ids.
//!
//! `tower_http` mints and echoes `x-request-id`. The two middlewares here
//! wrap it: one drops client ids that are not safe to log, the other records
//! the final id on the request span.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::RequestId;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

fn is_safe_client_id(value: &HeaderValue) -> bool {
    value.to_str().is_ok_and(|s| {
        !s.is_empty()
            && s.len() <= 128
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

/// Removes a malformed client `x-request-id` so a fresh one is minted.
pub async fn discard_unsafe_request_id(mut req: Request, next: Next) -> Response {
    let unsafe_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .is_some_and(|value| !is_safe_client_id(value));
    if unsafe_id {
        req.headers_mut().remove(&REQUEST_ID_HEADER);
    }
    next.run(req).await
}

pub async fn record_request_id(req: Request, next: Next) -> Response {
    if let Some(id) = req
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
    {
        tracing::Span::current().record("request_id", id);
    }
    next.run(req).await
}
