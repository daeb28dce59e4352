//! Shared harness for the HTTP integration tests.
//!
//! Every test gets a fresh router over the in-memory store with a bootstrap
//! administrator, and drives it in-process through `tower::ServiceExt`.

use std::{future::Future, pin::Pin};

use anyhow::Context;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shorouk::{
    api::create_router,
    config::{Config, StoreBackend},
    state::{AppState, AppStateOptions},
};
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "AdminPass123!";
pub const STAFF_PASSWORD: &str = "StaffPass123!";
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub type TestFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database.backend = StoreBackend::Memory;
    config.database.run_migrations = false;
    config.auth.jwt_secret = Some(TEST_SECRET.to_string());
    config.bootstrap.admin_username = Some(ADMIN_USERNAME.to_string());
    config.bootstrap.admin_password = Some(ADMIN_PASSWORD.to_string());
    config.bootstrap.admin_email = Some("admin@hospital.test".to_string());
    config
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// Staff member created through the API, with a ready-to-use access token.
#[derive(Debug, Clone)]
pub struct Staff {
    pub id: String,
    pub username: String,
    pub token: String,
}

pub async fn with_test_app<F>(test: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(&'a TestApp) -> TestFuture<'a>,
{
    with_test_app_config(|_| {}, test).await
}

pub async fn with_test_app_config<C, F>(configure: C, test: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: for<'a> FnOnce(&'a TestApp) -> TestFuture<'a>,
{
    let mut config = test_config();
    configure(&mut config);
    let options = AppStateOptions {
        run_migrations: false,
        bootstrap_admin: true,
        store: StoreBackend::Memory,
    };
    let state = AppState::new_with_options(config, options)
        .await
        .context("failed to build test state")?;
    let app = TestApp {
        router: create_router(state.clone()),
        state,
    };
    test(&app).await
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        self.send(method, path, None, body, &[]).await
    }

    pub async fn request_as(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        self.send(method, path, Some(token), body, &[]).await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        self.send(method, path, None, body, headers).await
    }

    /// Sends a raw body, for malformed payload and content-type checks.
    pub async fn request_raw(
        &self,
        token: Option<&str>,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let request = builder.body(Body::from(body.to_string()))?;
        self.dispatch(request).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    async fn dispatch(
        &self,
        request: Request<Body>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok((status, headers, body))
    }

    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<Value> {
        let (status, _, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({ "username": username, "password": password })),
            )
            .await?;
        assert_status(status, StatusCode::OK, "login");
        Ok(body)
    }

    pub async fn admin_token(&self) -> anyhow::Result<String> {
        let body = self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
        string_field(&body, "token")
    }

    /// Creates a staff account as the bootstrap admin and logs it in.
    pub async fn create_staff(&self, username: &str, role: &str) -> anyhow::Result<Staff> {
        let admin = self.admin_token().await?;
        let (status, _, body) = self
            .request_as(
                &admin,
                Method::POST,
                "/api/v1/users",
                Some(json!({
                    "username": username,
                    "email": format!("{username}@hospital.test"),
                    "password": STAFF_PASSWORD,
                    "role": role,
                    "full_name": format!("Test {role} {username}"),
                })),
            )
            .await?;
        assert_status(status, StatusCode::CREATED, "create staff");
        let id = string_field(&body, "id")?;
        let login = self.login(username, STAFF_PASSWORD).await?;
        Ok(Staff {
            id,
            username: username.to_string(),
            token: string_field(&login, "token")?,
        })
    }

    pub async fn create_patient(&self, token: &str, medical_number: &str) -> anyhow::Result<Value> {
        let (status, _, body) = self
            .request_as(
                token,
                Method::POST,
                "/api/v1/patients",
                Some(patient_payload("Ahmed Hassan", medical_number)),
            )
            .await?;
        assert_status(status, StatusCode::CREATED, "create patient");
        Ok(body)
    }

    pub async fn create_visit(
        &self,
        nurse_token: &str,
        patient_id: &str,
        doctor_id: &str,
    ) -> anyhow::Result<Value> {
        let (status, _, body) = self
            .request_as(
                nurse_token,
                Method::POST,
                "/api/v1/visits",
                Some(json!({
                    "patient_id": patient_id,
                    "doctor_id": doctor_id,
                    "arrival_mode": "walk_in",
                    "chief_complaint": "Persistent headache",
                })),
            )
            .await?;
        assert_status(status, StatusCode::CREATED, "create visit");
        Ok(body)
    }

    /// Number of audit entries. Reading them is not itself audited.
    pub async fn audit_total(&self, admin_token: &str) -> anyhow::Result<i64> {
        let (status, _, body) = self
            .request_as(admin_token, Method::GET, "/api/v1/admin/audit-logs?limit=1", None)
            .await?;
        assert_status(status, StatusCode::OK, "audit logs");
        body["total"].as_i64().context("audit total missing")
    }
}

pub fn patient_payload(full_name: &str, medical_number: &str) -> Value {
    json!({
        "full_name": full_name,
        "national_id": "29001011234567",
        "medical_number": medical_number,
        "date_of_birth": "1990-01-01",
        "gender": "male",
        "mobile_number": "+20 100 123 4567",
        "address": "12 Nile Street, Cairo",
        "emergency_contact": {
            "name": "Mona Hassan",
            "relationship": "sister",
            "phone": "01001234568"
        }
    })
}

pub fn nurse_assessment() -> Value {
    json!({
        "basic_info": {
            "arrival_mode": "ambulance",
            "chief_complaint": "Fall at home"
        },
        "vital_signs": {
            "temperature": 37.2,
            "pulse": 85,
            "blood_pressure_systolic": 120,
            "blood_pressure_diastolic": 80,
            "respiratory_rate": 18,
            "o2_saturation": 98
        },
        "morse_fall_scale": {
            "history_of_falling": true,
            "secondary_diagnosis": false,
            "ambulatory_aid": true,
            "iv_heparin_lock": false,
            "gait_transfer": false,
            "mental_status": false,
            "total_score": 0,
            "risk_level": "low"
        }
    })
}

pub fn doctor_evaluation() -> Value {
    json!({
        "patient_information": { "age": 45, "weight": 80.5, "height": 175.0 },
        "study_indication": { "primary_indication": "Rule out fracture" },
        "technical_parameters": {
            "ctd1vol": 12.5,
            "dlp": 450.0,
            "kv": 120,
            "mas": 200,
            "contrast_used": true,
            "contrast_volume": 80.0
        }
    })
}

pub fn string_field(body: &Value, field: &str) -> anyhow::Result<String> {
    body[field]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("response has no string field '{field}': {body}"))
}

pub fn assert_status(got: StatusCode, expected: StatusCode, what: &str) {
    assert_eq!(got, expected, "unexpected status for {what}");
}

/// Fields named in the `details` of a 422 response.
pub fn violation_fields(body: &Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
