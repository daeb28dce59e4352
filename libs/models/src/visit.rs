//! Clinical visits and their status lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::validation::{FieldViolation, Violations};
use crate::{parse_uuid_field, ParseEnumError};

const MAX_COMPLAINT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Created,
    InProgress,
    Completed,
    Cancelled,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Created => "created",
            VisitStatus::InProgress => "in_progress",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitStatus::Completed | VisitStatus::Cancelled)
    }

    /// Allowed moves: created -> in_progress | cancelled, in_progress -> completed | cancelled.
    pub fn can_transition_to(&self, next: VisitStatus) -> bool {
        use VisitStatus::*;
        matches!(
            (self, next),
            (Created, InProgress)
                | (Created, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // "open" was the initial status before visits were tracked end to end.
            "created" | "open" => Ok(VisitStatus::Created),
            "in_progress" | "in-progress" => Ok(VisitStatus::InProgress),
            "completed" => Ok(VisitStatus::Completed),
            "cancelled" | "canceled" => Ok(VisitStatus::Cancelled),
            other => Err(ParseEnumError::new("visit status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalMode {
    WalkIn,
    Ambulance,
    Wheelchair,
    Stretcher,
    Referral,
}

impl ArrivalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrivalMode::WalkIn => "walk_in",
            ArrivalMode::Ambulance => "ambulance",
            ArrivalMode::Wheelchair => "wheelchair",
            ArrivalMode::Stretcher => "stretcher",
            ArrivalMode::Referral => "referral",
        }
    }
}

impl fmt::Display for ArrivalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArrivalMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "walk_in" => Ok(ArrivalMode::WalkIn),
            "ambulance" => Ok(ArrivalMode::Ambulance),
            "wheelchair" => Ok(ArrivalMode::Wheelchair),
            "stretcher" => Ok(ArrivalMode::Stretcher),
            "referral" => Ok(ArrivalMode::Referral),
            other => Err(ParseEnumError::new("arrival mode", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub nurse_id: Uuid,
    pub doctor_id: Uuid,
    pub arrival_mode: ArrivalMode,
    pub chief_complaint: String,
    pub status: VisitStatus,
    pub visit_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /visits` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateVisitRequest {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub doctor_id: String,
    #[serde(default)]
    pub arrival_mode: String,
    #[serde(default)]
    pub chief_complaint: String,
    pub visit_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub arrival_mode: ArrivalMode,
    pub chief_complaint: String,
    pub visit_date: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps or bare dates (taken as midnight UTC).
fn parse_visit_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl CreateVisitRequest {
    pub fn into_new_visit(self) -> Result<NewVisit, Vec<FieldViolation>> {
        let mut violations = Violations::new();

        let patient_id = parse_uuid_field(&mut violations, "patient_id", &self.patient_id);
        let doctor_id = parse_uuid_field(&mut violations, "doctor_id", &self.doctor_id);

        let arrival_mode = match self.arrival_mode.parse::<ArrivalMode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                violations.push("arrival_mode", "enum", e.to_string());
                None
            }
        };

        let complaint = self.chief_complaint.trim();
        let complaint_chars = complaint.chars().count();
        if complaint_chars == 0 || complaint_chars > MAX_COMPLAINT_CHARS {
            violations.push(
                "chief_complaint",
                "length",
                format!("chief_complaint must be 1-{MAX_COMPLAINT_CHARS} characters"),
            );
        }

        let visit_date = match self.visit_date.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_visit_date(raw);
                if parsed.is_none() {
                    violations.push(
                        "visit_date",
                        "format",
                        "visit_date must be an RFC 3339 timestamp or YYYY-MM-DD date",
                    );
                }
                parsed
            }
        };

        let visit = NewVisit {
            patient_id: patient_id.unwrap_or_default(),
            doctor_id: doctor_id.unwrap_or_default(),
            arrival_mode: arrival_mode.unwrap_or(ArrivalMode::WalkIn),
            chief_complaint: complaint.to_string(),
            visit_date,
        };
        violations.finish(visit)
    }
}

/// `PATCH /visits/{id}/status` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusChangeRequest {
    #[serde(default)]
    pub status: String,
}

impl StatusChangeRequest {
    pub fn into_status(self) -> Result<VisitStatus, Vec<FieldViolation>> {
        self.status
            .parse::<VisitStatus>()
            .map_err(|e| vec![FieldViolation::new("status", "enum", e.to_string())])
    }
}
