#[allow(unused)]
mod support;

use axum::http::{Method, StatusCode};
use support::*;

#[tokio::test]
async fn api_responses_carry_hardening_headers() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (_, headers, _) = app.request(Method::GET, "/api/v1/admin/health", None).await?;
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            assert_eq!(header("x-content-type-options").as_deref(), Some("nosniff"));
            assert_eq!(header("x-frame-options").as_deref(), Some("DENY"));
            assert_eq!(header("referrer-policy").as_deref(), Some("no-referrer"));
            assert_eq!(header("cache-control").as_deref(), Some("no-store"));
            assert!(header("content-security-policy").is_some());
            // Plain HTTP in tests.
            assert!(header("strict-transport-security").is_none());

            let (_, headers, _) = app
                .request_with_extra_headers(
                    Method::GET,
                    "/health",
                    None,
                    &[("x-forwarded-proto", "https")],
                )
                .await?;
            assert!(headers.get("strict-transport-security").is_some());
            assert!(headers.get("cache-control").is_none());
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn request_ids_are_echoed_or_minted() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (_, headers, _) = app
                .request_with_extra_headers(
                    Method::GET,
                    "/health",
                    None,
                    &[("x-request-id", "trace-abc.123")],
                )
                .await?;
            assert_eq!(
                headers.get("x-request-id").and_then(|v| v.to_str().ok()),
                Some("trace-abc.123")
            );

            let (_, headers, _) = app
                .request_with_extra_headers(
                    Method::GET,
                    "/health",
                    None,
                    &[("x-request-id", "not ok; drop table")],
                )
                .await?;
            let minted = headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            assert!(uuid::Uuid::parse_str(minted).is_ok(), "minted id: {minted}");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn malformed_bodies_are_rejected_by_kind() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, _, body) = app
                .request_raw(
                    None,
                    Method::POST,
                    "/api/v1/auth/login",
                    Some("application/json"),
                    "{\"username\": ",
                )
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "syntax error");
            assert!(body["error"].as_str().unwrap_or_default().starts_with("Malformed JSON"));

            let (status, _, body) = app
                .request_raw(
                    None,
                    Method::POST,
                    "/api/v1/auth/login",
                    Some("application/json"),
                    "{\"username\": 42, \"password\": true}",
                )
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "wrong types");
            assert_eq!(violation_fields(&body), vec!["username"]);

            let (status, _, body) = app
                .request_raw(
                    None,
                    Method::POST,
                    "/api/v1/auth/login",
                    Some("application/json"),
                    "[\"admin\"]",
                )
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "wrong document shape");
            assert_eq!(violation_fields(&body), vec!["body"]);

            let (status, _, _) = app
                .request_raw(
                    None,
                    Method::POST,
                    "/api/v1/auth/login",
                    Some("text/plain"),
                    "username=admin",
                )
                .await?;
            assert_status(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "form body");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn malformed_query_strings_use_the_error_envelope() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let admin = app.admin_token().await?;
            for path in [
                "/api/v1/patients?limit=abc",
                "/api/v1/users?is_active=maybe",
                "/api/v1/visits?offset=-x",
                "/api/v1/admin/audit-logs?limit=1.5",
            ] {
                let (status, headers, body) =
                    app.request_as(&admin, Method::GET, path, None).await?;
                assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, path);
                assert!(
                    headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|ct| ct.starts_with("application/json")),
                    "{path} content type"
                );
                assert!(body["error"].is_string(), "{path} body: {body}");
                assert_eq!(violation_fields(&body), vec!["query"]);
            }
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            for path in ["/api/v2/patients", "/api/v1/radiographs", "/nothing-here"] {
                let (status, _, body) = app.request(Method::GET, path, None).await?;
                assert_status(status, StatusCode::NOT_FOUND, path);
                assert_eq!(body["error"], "Route not found");
            }
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn unsupported_methods_get_a_json_405() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, _, body) = app.request(Method::DELETE, "/health", None).await?;
            assert_status(status, StatusCode::METHOD_NOT_ALLOWED, "DELETE /health");
            assert_eq!(body["error"], "Method not allowed");

            let admin = app.admin_token().await?;
            let (status, _, body) = app
                .request_as(&admin, Method::DELETE, "/api/v1/patients", None)
                .await?;
            assert_status(status, StatusCode::METHOD_NOT_ALLOWED, "DELETE /patients");
            assert_eq!(body["error"], "Method not allowed");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn cors_is_closed_unless_origins_are_configured() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (_, headers, _) = app
                .request_with_extra_headers(
                    Method::GET,
                    "/api/v1/admin/health",
                    None,
                    &[("origin", "https://evil.example")],
                )
                .await?;
            assert!(headers.get("access-control-allow-origin").is_none());
            Ok(())
        })
    })
    .await?;

    with_test_app_config(
        |config| config.server.cors_origins = vec!["https://radiology.example".to_string()],
        |app| {
            Box::pin(async move {
                let (status, headers, _) = app
                    .request_with_extra_headers(
                        Method::OPTIONS,
                        "/api/v1/patients",
                        None,
                        &[
                            ("origin", "https://radiology.example"),
                            ("access-control-request-method", "POST"),
                            ("access-control-request-headers", "authorization,content-type"),
                        ],
                    )
                    .await?;
                assert!(status.is_success(), "preflight status {status}");
                assert_eq!(
                    headers
                        .get("access-control-allow-origin")
                        .and_then(|v| v.to_str().ok()),
                    Some("https://radiology.example")
                );

                let (_, headers, _) = app
                    .request_with_extra_headers(
                        Method::GET,
                        "/api/v1/admin/health",
                        None,
                        &[("origin", "https://evil.example")],
                    )
                    .await?;
                assert!(headers.get("access-control-allow-origin").is_none());
                Ok(())
            })
        },
    )
    .await
}

#[tokio::test]
async fn websocket_handshake_checks_token_first() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, _, _) = app.request(Method::GET, "/api/v1/ws", None).await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "ws without token");

            let (status, _, _) = app
                .request(Method::GET, "/api/v1/ws?token=forged", None)
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "ws with bad token");

            // A valid token over a plain request is not an upgrade.
            let token = app.admin_token().await?;
            let path = format!("/api/v1/ws?token={}", urlencoding::encode(&token));
            let (status, _, _) = app.request(Method::GET, &path, None).await?;
            assert_status(status, StatusCode::BAD_REQUEST, "ws without upgrade");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn websocket_is_404_when_realtime_is_off() -> anyhow::Result<()> {
    with_test_app_config(
        |config| config.realtime.enabled = false,
        |app| {
            Box::pin(async move {
                let token = app.admin_token().await?;
                let path = format!("/api/v1/ws?token={}", urlencoding::encode(&token));
                let (status, _, _) = app.request(Method::GET, &path, None).await?;
                assert_status(status, StatusCode::NOT_FOUND, "ws disabled");
                Ok(())
            })
        },
    )
    .await
}
