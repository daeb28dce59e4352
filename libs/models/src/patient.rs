//! Patient demographics.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{is_valid_phone, FieldViolation, Violations, NATIONAL_ID_RE};
use crate::ParseEnumError;

/// Oldest plausible patient, in years.
const MAX_AGE_YEARS: i32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(ParseEnumError::new("gender", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmergencyContact {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "relationship must be 1-100 characters"))]
    pub relationship: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub medical_number: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub mobile_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Case-insensitive substring match over the searchable fields.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            Some(self.full_name.as_str()),
            Some(self.national_id.as_str()),
            Some(self.medical_number.as_str()),
            self.mobile_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Payload for `POST /patients` and `PUT /patients/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PatientRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 255, message = "full_name must be 2-255 characters"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(regex(path = *NATIONAL_ID_RE, message = "national_id must be 6-20 digits"))]
    pub national_id: String,
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "medical_number must be 3-50 characters"))]
    pub medical_number: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub gender: String,
    pub mobile_number: Option<String>,
    #[validate(length(max = 500, message = "address must be at most 500 characters"))]
    pub address: Option<String>,
    #[validate(nested)]
    pub emergency_contact: Option<EmergencyContact>,
}

/// Validated patient fields, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFields {
    pub full_name: String,
    pub national_id: String,
    pub medical_number: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub mobile_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Completed years between `dob` and `today`.
fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age - 1
    } else {
        age
    }
}

impl PatientRequest {
    /// Validates the payload. `today` bounds the date of birth.
    pub fn into_fields(self, today: NaiveDate) -> Result<PatientFields, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        violations.check("", &self);

        let date_of_birth = match NaiveDate::parse_from_str(self.date_of_birth.trim(), "%Y-%m-%d")
        {
            Ok(dob) if dob > today => {
                violations.push("date_of_birth", "range", "date_of_birth is in the future");
                None
            }
            Ok(dob) if age_on(dob, today) > MAX_AGE_YEARS => {
                violations.push(
                    "date_of_birth",
                    "range",
                    format!("date_of_birth implies an age above {MAX_AGE_YEARS} years"),
                );
                None
            }
            Ok(dob) => Some(dob),
            Err(_) => {
                violations.push(
                    "date_of_birth",
                    "format",
                    "date_of_birth must be a date in YYYY-MM-DD format",
                );
                None
            }
        };

        let gender = match self.gender.parse::<Gender>() {
            Ok(g) => Some(g),
            Err(e) => {
                violations.push("gender", "enum", e.to_string());
                None
            }
        };

        if let Some(mobile) = self.mobile_number.as_deref() {
            if !is_valid_phone(mobile) {
                violations.push(
                    "mobile_number",
                    "phone",
                    "mobile_number must contain at least 10 digits",
                );
            }
        }
        if let Some(contact) = self.emergency_contact.as_ref() {
            if !is_valid_phone(&contact.phone) {
                violations.push(
                    "emergency_contact.phone",
                    "phone",
                    "phone must contain at least 10 digits",
                );
            }
        }

        // Placeholders below are only reachable when a violation was recorded.
        let fields = PatientFields {
            full_name: self.full_name.trim().to_string(),
            national_id: self.national_id,
            medical_number: self.medical_number.trim().to_string(),
            date_of_birth: date_of_birth.unwrap_or(today),
            gender: gender.unwrap_or(Gender::Male),
            mobile_number: self.mobile_number,
            address: self.address,
            emergency_contact: self.emergency_contact,
        };
        violations.finish(fields)
    }
}
