#[allow(unused)]
mod support;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use support::*;

struct OpenVisit {
    nurse: Staff,
    doctor: Staff,
    visit_id: String,
}

async fn open_visit(app: &TestApp) -> anyhow::Result<OpenVisit> {
    let nurse = app.create_staff("nurse_dina", "nurse").await?;
    let doctor = app.create_staff("dr_tarek", "doctor").await?;
    let patient = app.create_patient(&nurse.token, "MRN-8001").await?;
    let visit = app
        .create_visit(&nurse.token, &string_field(&patient, "id")?, &doctor.id)
        .await?;
    Ok(OpenVisit {
        visit_id: string_field(&visit, "id")?,
        nurse,
        doctor,
    })
}

async fn create_nurse_form(app: &TestApp, token: &str, visit_id: &str) -> anyhow::Result<Value> {
    let (status, _, body) = app
        .request_as(
            token,
            Method::POST,
            "/api/v1/nurse-forms",
            Some(json!({ "visit_id": visit_id, "assessment_data": nurse_assessment() })),
        )
        .await?;
    assert_status(status, StatusCode::CREATED, "create nurse form");
    Ok(body)
}

async fn create_doctor_form(
    app: &TestApp,
    token: &str,
    visit_id: &str,
) -> anyhow::Result<(StatusCode, Value)> {
    let (status, _, body) = app
        .request_as(
            token,
            Method::POST,
            "/api/v1/doctor-forms",
            Some(json!({ "visit_id": visit_id, "evaluation_data": doctor_evaluation() })),
        )
        .await?;
    Ok((status, body))
}

#[tokio::test]
async fn fall_score_is_computed_by_the_server() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let form = create_nurse_form(app, &visit.nurse.token, &visit.visit_id).await?;

            assert_eq!(form["status"], "draft");
            assert_eq!(form["nurse_id"], visit.nurse.id.as_str());
            assert_eq!(form["visit_id"], visit.visit_id.as_str());
            assert!(form["submitted_at"].is_null());
            let morse = &form["assessment_data"]["morse_fall_scale"];
            assert_eq!(morse["total_score"], 40);
            assert_eq!(morse["risk_level"], "moderate");
            assert_eq!(form["assessment_data"]["vital_signs"]["pulse"], 85);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn unknown_sections_are_preserved() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let mut assessment = nurse_assessment();
            assessment["allergies"] = json!({ "penicillin": true });
            assessment["basic_info"]["escort"] = json!("son");

            let (status, _, form) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({ "visit_id": visit.visit_id, "assessment_data": assessment })),
                )
                .await?;
            assert_status(status, StatusCode::CREATED, "form with extras");
            assert_eq!(form["assessment_data"]["allergies"]["penicillin"], true);
            assert_eq!(form["assessment_data"]["basic_info"]["escort"], "son");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn vital_sign_violations_use_dotted_paths() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let mut assessment = nurse_assessment();
            assessment["vital_signs"]["pulse"] = json!(300);
            assessment["vital_signs"]["blood_pressure_diastolic"] = json!(130);

            let (status, _, body) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({ "visit_id": visit.visit_id, "assessment_data": assessment })),
                )
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "bad vitals");
            assert_eq!(
                violation_fields(&body),
                vec![
                    "assessment_data.vital_signs.blood_pressure_diastolic",
                    "assessment_data.vital_signs.pulse"
                ]
            );
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn negative_and_fractional_vitals_name_the_field() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;

            let mut assessment = nurse_assessment();
            assessment["vital_signs"]["pulse"] = json!(-5);
            let (status, _, body) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({ "visit_id": visit.visit_id, "assessment_data": assessment })),
                )
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "negative pulse");
            assert_eq!(violation_fields(&body), vec!["assessment_data.vital_signs.pulse"]);
            assert_eq!(body["details"][0]["code"], "range");

            let mut assessment = nurse_assessment();
            assessment["vital_signs"]["pulse"] = json!(72.5);
            let (status, _, body) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({ "visit_id": visit.visit_id, "assessment_data": assessment })),
                )
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "fractional pulse");
            assert_eq!(violation_fields(&body), vec!["assessment_data.vital_signs.pulse"]);
            assert_eq!(body["details"][0]["code"], "type");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn forms_need_an_open_visit() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;

            let (status, _, body) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({
                        "visit_id": "00000000-0000-0000-0000-0000000000aa",
                        "assessment_data": nurse_assessment()
                    })),
                )
                .await?;
            assert_status(status, StatusCode::UNPROCESSABLE_ENTITY, "dangling visit");
            assert_eq!(violation_fields(&body), vec!["visit_id"]);

            app.request_as(
                &visit.nurse.token,
                Method::PATCH,
                &format!("/api/v1/visits/{}/status", visit.visit_id),
                Some(json!({ "status": "cancelled" })),
            )
            .await?;
            let (status, _, _) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({
                        "visit_id": visit.visit_id,
                        "assessment_data": nurse_assessment()
                    })),
                )
                .await?;
            assert_status(status, StatusCode::CONFLICT, "cancelled visit");

            let (status, _) = create_doctor_form(app, &visit.doctor.token, &visit.visit_id).await?;
            assert_status(status, StatusCode::CONFLICT, "doctor form on cancelled visit");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn drafts_are_edited_then_locked_by_submit() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let form = create_nurse_form(app, &visit.nurse.token, &visit.visit_id).await?;
            let id = string_field(&form, "id")?;

            let mut assessment = nurse_assessment();
            assessment["morse_fall_scale"]["iv_heparin_lock"] = json!(true);
            let (status, _, updated) = app
                .request_as(
                    &visit.nurse.token,
                    Method::PUT,
                    &format!("/api/v1/nurse-forms/{id}"),
                    Some(json!({ "assessment_data": assessment })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "update draft");
            assert_eq!(updated["assessment_data"]["morse_fall_scale"]["total_score"], 60);
            assert_eq!(updated["assessment_data"]["morse_fall_scale"]["risk_level"], "high");

            let (status, _, submitted) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    &format!("/api/v1/nurse-forms/{id}/submit"),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "submit");
            assert_eq!(submitted["status"], "submitted");
            assert!(submitted["submitted_at"].is_string());

            let (status, _, _) = app
                .request_as(
                    &visit.nurse.token,
                    Method::PUT,
                    &format!("/api/v1/nurse-forms/{id}"),
                    Some(json!({ "assessment_data": nurse_assessment() })),
                )
                .await?;
            assert_status(status, StatusCode::CONFLICT, "edit submitted");

            let (status, _, _) = app
                .request_as(
                    &visit.nurse.token,
                    Method::POST,
                    &format!("/api/v1/nurse-forms/{id}/submit"),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::CONFLICT, "resubmit");

            let (_, _, fetched) = app
                .request_as(
                    &visit.doctor.token,
                    Method::GET,
                    &format!("/api/v1/nurse-forms/{id}"),
                    None,
                )
                .await?;
            assert_eq!(fetched["assessment_data"]["morse_fall_scale"]["total_score"], 60);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn only_the_author_may_change_a_form() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let other_nurse = app.create_staff("nurse_other", "nurse").await?;
            let form = create_nurse_form(app, &visit.nurse.token, &visit.visit_id).await?;
            let id = string_field(&form, "id")?;

            let (status, _, _) = app
                .request_as(
                    &other_nurse.token,
                    Method::PUT,
                    &format!("/api/v1/nurse-forms/{id}"),
                    Some(json!({ "assessment_data": nurse_assessment() })),
                )
                .await?;
            assert_status(status, StatusCode::FORBIDDEN, "other nurse edits");

            let (status, _, _) = app
                .request_as(
                    &other_nurse.token,
                    Method::POST,
                    &format!("/api/v1/nurse-forms/{id}/submit"),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::FORBIDDEN, "other nurse submits");

            // Doctors never write nurse forms.
            let (status, _, _) = app
                .request_as(
                    &visit.doctor.token,
                    Method::POST,
                    "/api/v1/nurse-forms",
                    Some(json!({
                        "visit_id": visit.visit_id,
                        "assessment_data": nurse_assessment()
                    })),
                )
                .await?;
            assert_status(status, StatusCode::FORBIDDEN, "doctor writes nurse form");

            let (status, _) = create_doctor_form(app, &visit.nurse.token, &visit.visit_id).await?;
            assert_status(status, StatusCode::FORBIDDEN, "nurse writes doctor form");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn admins_may_author_either_form() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let admin = app.admin_token().await?;
            let (_, _, me) = app
                .request_as(&admin, Method::GET, "/api/v1/auth/me", None)
                .await?;

            let nurse_form = create_nurse_form(app, &admin, &visit.visit_id).await?;
            assert_eq!(nurse_form["nurse_id"], me["id"]);

            let (status, doctor_form) = create_doctor_form(app, &admin, &visit.visit_id).await?;
            assert_status(status, StatusCode::CREATED, "admin writes doctor form");
            assert_eq!(doctor_form["doctor_id"], me["id"]);

            // Authorship still binds: the assigned doctor cannot submit it.
            let (status, _, _) = app
                .request_as(
                    &visit.doctor.token,
                    Method::POST,
                    &format!("/api/v1/doctor-forms/{}/submit", string_field(&doctor_form, "id")?),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::FORBIDDEN, "doctor submits admin's form");

            let (status, _, _) = app
                .request_as(
                    &admin,
                    Method::POST,
                    &format!("/api/v1/nurse-forms/{}/submit", string_field(&nurse_form, "id")?),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "admin submits own nurse form");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn doctor_form_lifecycle_and_contrast_rule() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            let (status, form) =
                create_doctor_form(app, &visit.doctor.token, &visit.visit_id).await?;
            assert_status(status, StatusCode::CREATED, "doctor form");
            assert_eq!(form["doctor_id"], visit.doctor.id.as_str());
            assert_eq!(form["status"], "draft");
            assert_eq!(form["evaluation_data"]["technical_parameters"]["ctd1vol"], 12.5);
            let id = string_field(&form, "id")?;

            let mut evaluation = doctor_evaluation();
            evaluation["technical_parameters"]["contrast_used"] = json!(false);
            let (status, _, body) = app
                .request_as(
                    &visit.doctor.token,
                    Method::PUT,
                    &format!("/api/v1/doctor-forms/{id}"),
                    Some(json!({ "evaluation_data": evaluation })),
                )
                .await?;
            assert_status(
                status,
                StatusCode::UNPROCESSABLE_ENTITY,
                "contrast volume without contrast",
            );
            assert_eq!(
                violation_fields(&body),
                vec!["evaluation_data.technical_parameters.contrast_volume"]
            );
            assert_eq!(body["details"][0]["code"], "consistency");

            evaluation["technical_parameters"]["contrast_volume"] = json!(0.0);
            evaluation["findings"] = json!("No acute fracture");
            let (status, _, updated) = app
                .request_as(
                    &visit.doctor.token,
                    Method::PUT,
                    &format!("/api/v1/doctor-forms/{id}"),
                    Some(json!({ "evaluation_data": evaluation })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "update doctor form");
            assert_eq!(updated["evaluation_data"]["findings"], "No acute fracture");

            let (status, _, submitted) = app
                .request_as(
                    &visit.doctor.token,
                    Method::POST,
                    &format!("/api/v1/doctor-forms/{id}/submit"),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "submit doctor form");
            assert_eq!(submitted["status"], "submitted");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn forms_are_listed_per_visit() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let visit = open_visit(app).await?;
            create_nurse_form(app, &visit.nurse.token, &visit.visit_id).await?;
            create_nurse_form(app, &visit.nurse.token, &visit.visit_id).await?;
            create_doctor_form(app, &visit.doctor.token, &visit.visit_id).await?;

            let (status, _, body) = app
                .request_as(
                    &visit.doctor.token,
                    Method::GET,
                    &format!("/api/v1/nurse-forms?visit_id={}", visit.visit_id),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "list nurse forms");
            assert_eq!(body["total"], 2);
            assert_eq!(body["nurse_forms"].as_array().map(Vec::len), Some(2));

            let (_, _, body) = app
                .request_as(&visit.nurse.token, Method::GET, "/api/v1/doctor-forms", None)
                .await?;
            assert_eq!(body["total"], 1);
            assert!(body["doctor_forms"][0]["evaluation_data"].is_object());

            let (_, _, body) = app
                .request_as(
                    &visit.nurse.token,
                    Method::GET,
                    "/api/v1/nurse-forms?visit_id=00000000-0000-0000-0000-000000000000",
                    None,
                )
                .await?;
            assert_eq!(body["total"], 0);

            let (status, _, _) = app
                .request_as(&visit.nurse.token, Method::GET, "/api/v1/nurse-forms/not-an-id", None)
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "malformed form id");
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn nurse_form_gate_is_configurable() -> anyhow::Result<()> {
    with_test_app_config(
        |config| config.workflow.require_nurse_form_before_doctor_form = true,
        |app| {
            Box::pin(async move {
                let visit = open_visit(app).await?;

                let (status, _) =
                    create_doctor_form(app, &visit.doctor.token, &visit.visit_id).await?;
                assert_status(status, StatusCode::CONFLICT, "no nurse form yet");

                let form = create_nurse_form(app, &visit.nurse.token, &visit.visit_id).await?;
                let (status, _) =
                    create_doctor_form(app, &visit.doctor.token, &visit.visit_id).await?;
                assert_status(status, StatusCode::CONFLICT, "nurse form still a draft");

                app.request_as(
                    &visit.nurse.token,
                    Method::POST,
                    &format!("/api/v1/nurse-forms/{}/submit", string_field(&form, "id")?),
                    None,
                )
                .await?;
                let (status, _) =
                    create_doctor_form(app, &visit.doctor.token, &visit.visit_id).await?;
                assert_status(status, StatusCode::CREATED, "after submitted nurse form");
                Ok(())
            })
        },
    )
    .await
}
