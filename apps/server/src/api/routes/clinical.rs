use crate::api::handlers::{forms, patients, visits};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub fn clinical_routes() -> Router<AppState> {
    Router::new()
        // Patients
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id",
            get(patients::get_patient).put(patients::update_patient),
        )
        .route("/patients/:id/visits", get(patients::list_patient_visits))
        // Visits
        .route("/visits", get(visits::list_visits).post(visits::create_visit))
        .route("/visits/:id", get(visits::get_visit))
        .route("/visits/:id/status", patch(visits::change_visit_status))
        // Nurse assessments
        .route(
            "/nurse-forms",
            get(forms::list_nurse_forms).post(forms::create_nurse_form),
        )
        .route(
            "/nurse-forms/:id",
            get(forms::get_nurse_form).put(forms::update_nurse_form),
        )
        .route("/nurse-forms/:id/submit", post(forms::submit_nurse_form))
        // Doctor evaluations
        .route(
            "/doctor-forms",
            get(forms::list_doctor_forms).post(forms::create_doctor_form),
        )
        .route(
            "/doctor-forms/:id",
            get(forms::get_doctor_form).put(forms::update_doctor_form),
        )
        .route("/doctor-forms/:id/submit", post(forms::submit_doctor_form))
}
