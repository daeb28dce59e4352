//! Domain types shared by the Al-Shorouk radiology server and CLI.
//!
//! Request types deserialize leniently (missing fields default to empty) and
//! are converted into validated domain values with an `into_*` method that
//! returns every [`FieldViolation`] at once.

pub mod audit;
pub mod doctor_form;
pub mod form;
pub mod nurse_form;
pub mod patient;
pub mod user;
pub mod validation;
pub mod visit;

pub use audit::{AuditAction, AuditLogEntry, AuditRecord, EntityType};
pub use doctor_form::{
    CreateDoctorFormRequest, DoctorForm, EvaluationData, NewDoctorForm, TechnicalParameters,
    UpdateDoctorFormRequest,
};
pub use form::FormStatus;
pub use nurse_form::{
    AssessmentData, CreateNurseFormRequest, FallRiskLevel, MorseFallScale, NewNurseForm,
    NurseForm, UpdateNurseFormRequest, VitalSigns,
};
pub use patient::{EmergencyContact, Gender, Patient, PatientFields, PatientRequest};
pub use user::{CreateUserRequest, NewUser, Role, UpdateUserRequest, User, UserChanges};
pub use validation::{FieldViolation, Violations};
pub use visit::{ArrivalMode, CreateVisitRequest, NewVisit, StatusChangeRequest, Visit, VisitStatus};

/// Error returned when a string is not a member of one of the domain enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Parses a UUID field, recording a `format` violation on failure.
pub(crate) fn parse_uuid_field(
    violations: &mut Violations,
    field: &str,
    raw: &str,
) -> Option<uuid::Uuid> {
    match uuid::Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) if raw.trim().is_empty() => {
            violations.push(field, "required", format!("{field} is required"));
            None
        }
        Err(_) => {
            violations.push(field, "format", format!("{field} must be a UUID"));
            None
        }
    }
}
