//! HTTP surface: router assembly and the cross-cutting layers.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{config::ServerConfig, state::AppState};

pub const API_PREFIX: &str = "/api/v1";

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    let protected = routes::protected_routes().route_layer(from_fn_with_state(
        state.clone(),
        middleware::require_auth,
    ));
    let v1 = routes::public_routes().merge(protected);

    Router::new()
        .route("/health", get(handlers::admin::liveness))
        .nest(API_PREFIX, v1)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        // Path only: the WebSocket route carries a token in its query string.
                        tracing::info_span!(
                            "http_request",
                            method = %req.method(),
                            path = %req.uri().path(),
                            request_id = tracing::field::Empty,
                            user_id = tracing::field::Empty,
                        )
                    }),
                )
                .layer(from_fn(middleware::discard_unsafe_request_id))
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(from_fn(middleware::record_request_id))
                .layer(cors_layer(&state.config.server))
                .layer(from_fn(middleware::security_headers_middleware))
                .layer(DefaultBodyLimit::max(
                    state.config.server.max_request_body_size,
                )),
        )
        .with_state(state)
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
        .into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

/// No origins configured means no CORS headers at all (same-origin only).
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
