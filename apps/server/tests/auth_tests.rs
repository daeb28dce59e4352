#[allow(unused)]
mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::*;

#[tokio::test]
async fn login_returns_tokens_and_user_without_secrets() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let body = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;

            assert!(!string_field(&body, "token")?.is_empty());
            assert!(!string_field(&body, "refresh_token")?.is_empty());
            assert_eq!(body["user"]["username"], "admin");
            assert_eq!(body["user"]["role"], "admin");
            assert!(body["user"]["last_login_at"].is_string());
            assert!(body["user"].get("password").is_none());
            assert!(body["user"].get("password_hash").is_none());
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn login_accepts_email_case_insensitively() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let body = app.login("ADMIN@hospital.test", ADMIN_PASSWORD).await?;
            assert_eq!(body["user"]["username"], "admin");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn bad_credentials_are_401_with_bearer_challenge() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            for (username, password) in [("admin", "WrongPass123!"), ("nobody", "Whatever123!")] {
                let (status, headers, body) = app
                    .request(
                        Method::POST,
                        "/api/v1/auth/login",
                        Some(json!({ "username": username, "password": password })),
                    )
                    .await?;
                assert_status(status, StatusCode::UNAUTHORIZED, "bad login");
                assert_eq!(body["error"], "Invalid username or password");
                assert_eq!(
                    headers.get("www-authenticate").and_then(|v| v.to_str().ok()),
                    Some("Bearer")
                );
            }
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn blank_login_fields_are_422() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, _, body) = app
                .request(Method::POST, "/api/v1/auth/login", Some(json!({})))
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "blank login");
            assert_eq!(violation_fields(&body), vec!["username", "password"]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn refresh_rotates_and_rejects_access_tokens() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let login = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
            let access = string_field(&login, "token")?;
            let refresh = string_field(&login, "refresh_token")?;

            let (status, _, body) = app
                .request(
                    Method::POST,
                    "/api/v1/auth/refresh",
                    Some(json!({ "refresh_token": refresh })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "refresh");
            let new_access = string_field(&body, "token")?;
            assert!(!string_field(&body, "refresh_token")?.is_empty());

            let (status, _, me) = app
                .request_as(&new_access, Method::GET, "/api/v1/auth/me", None)
                .await?;
            assert_status(status, StatusCode::OK, "me with refreshed token");
            assert_eq!(me["username"], "admin");

            // An access token is not a refresh token.
            let (status, _, _) = app
                .request(
                    Method::POST,
                    "/api/v1/auth/refresh",
                    Some(json!({ "refresh_token": access })),
                )
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "access token as refresh");

            let (status, _, _) = app
                .request(
                    Method::POST,
                    "/api/v1/auth/refresh",
                    Some(json!({ "refresh_token": "not.a.jwt" })),
                )
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "garbage refresh");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn refresh_token_is_not_a_bearer_token() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let login = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
            let refresh = string_field(&login, "refresh_token")?;
            let (status, _, _) = app
                .request_as(&refresh, Method::GET, "/api/v1/auth/me", None)
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "refresh as bearer");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn protected_routes_require_a_token() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            for path in [
                "/api/v1/auth/me",
                "/api/v1/users",
                "/api/v1/patients",
                "/api/v1/visits",
                "/api/v1/nurse-forms",
                "/api/v1/doctor-forms",
                "/api/v1/admin/audit-logs",
            ] {
                let (status, headers, body) = app.request(Method::GET, path, None).await?;
                assert_status(status, StatusCode::UNAUTHORIZED, path);
                assert!(body["error"].is_string(), "{path} error body");
                assert!(headers.get("www-authenticate").is_some());
            }

            let (status, _, _) = app
                .request_as("definitely-not-a-token", Method::GET, "/api/v1/patients", None)
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "garbage bearer");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn deactivated_accounts_lose_access_immediately() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let nurse = app.create_staff("nurse_amal", "nurse").await?;
            let admin = app.admin_token().await?;

            let (status, _, _) = app
                .request_as(
                    &admin,
                    Method::PATCH,
                    &format!("/api/v1/users/{}", nurse.id),
                    Some(json!({ "is_active": false })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "deactivate");

            let (status, _, _) = app
                .request_as(&nurse.token, Method::GET, "/api/v1/patients", None)
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "old token after deactivation");

            let (status, _, _) = app
                .request(
                    Method::POST,
                    "/api/v1/auth/login",
                    Some(json!({ "username": nurse.username, "password": STAFF_PASSWORD })),
                )
                .await?;
            assert_status(status, StatusCode::UNAUTHORIZED, "login after deactivation");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn successful_login_is_audited() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let admin = app.admin_token().await?;
            let (status, _, body) = app
                .request_as(
                    &admin,
                    Method::GET,
                    "/api/v1/admin/audit-logs?action=login",
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "audit logs");
            assert_eq!(body["total"], 1);
            assert_eq!(body["logs"][0]["entity_type"], "user");

            // Failed attempts leave no trace.
            let _ = app
                .request(
                    Method::POST,
                    "/api/v1/auth/login",
                    Some(json!({ "username": "admin", "password": "WrongPass123!" })),
                )
                .await?;
            assert_eq!(app.audit_total(&admin).await?, 2);
            Ok(())
        })
    })
    .await
}
