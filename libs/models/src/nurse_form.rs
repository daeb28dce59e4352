//! Nursing assessment recorded when a patient arrives for an exam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::form::FormStatus;
use crate::parse_uuid_field;
use crate::validation::{FieldViolation, Violations};
use crate::visit::ArrivalMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct BasicInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000, message = "chief_complaint must be at most 1000 characters"))]
    pub chief_complaint: Option<String>,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct VitalSigns {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(
        min = 30.0,
        max = 45.0,
        message = "temperature must be between 30 and 45"
    ))]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 20, max = 250, message = "pulse must be between 20 and 250"))]
    pub pulse: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(
        min = 50,
        max = 300,
        message = "blood_pressure_systolic must be between 50 and 300"
    ))]
    pub blood_pressure_systolic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(
        min = 20,
        max = 200,
        message = "blood_pressure_diastolic must be between 20 and 200"
    ))]
    pub blood_pressure_diastolic: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 4, max = 80, message = "respiratory_rate must be between 4 and 80"))]
    pub respiratory_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 50, max = 100, message = "o2_saturation must be between 50 and 100"))]
    pub o2_saturation: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallRiskLevel {
    #[default]
    Low,
    Moderate,
    High,
}

impl FallRiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=24 => FallRiskLevel::Low,
            25..=44 => FallRiskLevel::Moderate,
            _ => FallRiskLevel::High,
        }
    }
}

/// Morse fall scale items. `total_score` and `risk_level` are derived and
/// whatever the client sends for them is replaced by [`MorseFallScale::scored`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MorseFallScale {
    #[serde(default)]
    pub history_of_falling: bool,
    #[serde(default)]
    pub secondary_diagnosis: bool,
    #[serde(default)]
    pub ambulatory_aid: bool,
    #[serde(default)]
    pub iv_heparin_lock: bool,
    #[serde(default)]
    pub gait_transfer: bool,
    #[serde(default)]
    pub mental_status: bool,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default)]
    pub risk_level: FallRiskLevel,
}

impl MorseFallScale {
    pub fn score(&self) -> u32 {
        [
            (self.history_of_falling, 25),
            (self.secondary_diagnosis, 15),
            (self.ambulatory_aid, 15),
            (self.iv_heparin_lock, 20),
            (self.gait_transfer, 10),
            (self.mental_status, 15),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, points)| points)
        .sum()
    }

    pub fn scored(mut self) -> Self {
        self.total_score = self.score();
        self.risk_level = FallRiskLevel::from_score(self.total_score);
        self
    }
}

/// Structured body of a nurse form. Sections other than the three known
/// ones are kept verbatim in `additional`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct AssessmentData {
    #[serde(default)]
    #[validate(nested)]
    pub basic_info: BasicInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub vital_signs: Option<VitalSigns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morse_fall_scale: Option<MorseFallScale>,
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl AssessmentData {
    /// Validates the assessment under `prefix` and returns it with the fall
    /// scale rescored.
    fn checked(self, prefix: &str, violations: &mut Violations) -> Self {
        violations.check(prefix, &self);

        if let Some(mode) = self.basic_info.arrival_mode.as_deref() {
            if let Err(e) = mode.parse::<ArrivalMode>() {
                violations.push(
                    format!("{prefix}.basic_info.arrival_mode"),
                    "enum",
                    e.to_string(),
                );
            }
        }
        if let Some(vitals) = self.vital_signs.as_ref() {
            if let (Some(systolic), Some(diastolic)) =
                (vitals.blood_pressure_systolic, vitals.blood_pressure_diastolic)
            {
                if diastolic >= systolic {
                    violations.push(
                        format!("{prefix}.vital_signs.blood_pressure_diastolic"),
                        "consistency",
                        "blood_pressure_diastolic must be lower than blood_pressure_systolic",
                    );
                }
            }
        }

        Self {
            morse_fall_scale: self.morse_fall_scale.map(MorseFallScale::scored),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurseForm {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub nurse_id: Uuid,
    pub status: FormStatus,
    pub assessment_data: AssessmentData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// `POST /nurse-forms` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNurseFormRequest {
    #[serde(default)]
    pub visit_id: String,
    #[serde(default)]
    pub assessment_data: AssessmentData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNurseForm {
    pub visit_id: Uuid,
    pub assessment_data: AssessmentData,
}

impl CreateNurseFormRequest {
    pub fn into_new_form(self) -> Result<NewNurseForm, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        let visit_id = parse_uuid_field(&mut violations, "visit_id", &self.visit_id);
        let assessment_data = self.assessment_data.checked("assessment_data", &mut violations);
        violations.finish(NewNurseForm {
            visit_id: visit_id.unwrap_or_default(),
            assessment_data,
        })
    }
}

/// `PUT /nurse-forms/{id}` payload. Replaces the assessment of a draft.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNurseFormRequest {
    #[serde(default)]
    pub assessment_data: AssessmentData,
}

impl UpdateNurseFormRequest {
    pub fn into_assessment(self) -> Result<AssessmentData, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        let assessment_data = self.assessment_data.checked("assessment_data", &mut violations);
        violations.finish(assessment_data)
    }
}
