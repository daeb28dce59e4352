//! Radiologist evaluation, including the dose parameters of the study.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::form::FormStatus;
use crate::parse_uuid_field;
use crate::validation::{FieldViolation, Violations};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PatientInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 150, message = "age must be between 0 and 150"))]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.5, max = 500.0, message = "weight must be between 0.5 and 500 kg"))]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 20.0, max = 280.0, message = "height must be between 20 and 280 cm"))]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StudyIndication {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "primary_indication must be at most 2000 characters"))]
    pub primary_indication: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 5000, message = "clinical_history must be at most 5000 characters"))]
    pub clinical_history: Option<String>,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

/// Dose and acquisition parameters. `ctd1vol` is also accepted as `ctdivol`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TechnicalParameters {
    #[serde(default, alias = "ctdivol", skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 1000.0, message = "ctd1vol must be between 0 and 1000 mGy"))]
    pub ctd1vol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 20000.0, message = "dlp must be between 0 and 20000 mGy*cm"))]
    pub dlp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 40, max = 150, message = "kv must be between 40 and 150"))]
    pub kv: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 2000, message = "mas must be between 1 and 2000"))]
    pub mas: Option<i64>,
    #[serde(default)]
    pub contrast_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(
        min = 0.0,
        max = 500.0,
        message = "contrast_volume must be between 0 and 500 ml"
    ))]
    pub contrast_volume: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EvaluationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub patient_information: Option<PatientInformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub study_indication: Option<StudyIndication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub technical_parameters: Option<TechnicalParameters>,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl EvaluationData {
    fn checked(self, prefix: &str, violations: &mut Violations) -> Self {
        violations.check(prefix, &self);
        if let Some(params) = self.technical_parameters.as_ref() {
            let volume = params.contrast_volume.unwrap_or(0.0);
            if !params.contrast_used && volume != 0.0 {
                violations.push(
                    format!("{prefix}.technical_parameters.contrast_volume"),
                    "consistency",
                    "contrast_volume must be absent or 0 when contrast_used is false",
                );
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorForm {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub doctor_id: Uuid,
    pub status: FormStatus,
    pub evaluation_data: EvaluationData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// `POST /doctor-forms` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDoctorFormRequest {
    #[serde(default)]
    pub visit_id: String,
    #[serde(default)]
    pub evaluation_data: EvaluationData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDoctorForm {
    pub visit_id: Uuid,
    pub evaluation_data: EvaluationData,
}

impl CreateDoctorFormRequest {
    pub fn into_new_form(self) -> Result<NewDoctorForm, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        let visit_id = parse_uuid_field(&mut violations, "visit_id", &self.visit_id);
        let evaluation_data = self.evaluation_data.checked("evaluation_data", &mut violations);
        violations.finish(NewDoctorForm {
            visit_id: visit_id.unwrap_or_default(),
            evaluation_data,
        })
    }
}

/// `PUT /doctor-forms/{id}` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorFormRequest {
    #[serde(default)]
    pub evaluation_data: EvaluationData,
}

impl UpdateDoctorFormRequest {
    pub fn into_evaluation(self) -> Result<EvaluationData, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        let evaluation_data = self.evaluation_data.checked("evaluation_data", &mut violations);
        violations.finish(evaluation_data)
    }
}
