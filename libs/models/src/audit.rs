//! Append-only audit trail entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Patient,
    Visit,
    NurseForm,
    DoctorForm,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Patient => "patient",
            EntityType::Visit => "visit",
            EntityType::NurseForm => "nurse_form",
            EntityType::DoctorForm => "doctor_form",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    Create,
    Update,
    StatusChange,
    Submit,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::StatusChange => "status_change",
            AuditAction::Submit => "submit",
        }
    }

    /// Past-tense form used in real-time event names (`visit.status_changed`).
    pub fn past_tense(&self) -> &'static str {
        match self {
            AuditAction::Login => "logged_in",
            AuditAction::Create => "created",
            AuditAction::Update => "updated",
            AuditAction::StatusChange => "status_changed",
            AuditAction::Submit => "submitted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored audit entry. `action` and `entity_type` are kept as text so that
/// entries written by older releases stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// An audit entry waiting to be written alongside the mutation it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub details: Option<Value>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            user_id: None,
            action,
            entity_type,
            entity_id,
            details: None,
        }
    }

    pub fn by(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Event name published on the real-time channel once the mutation commits.
    pub fn event_name(&self) -> String {
        format!("{}.{}", self.entity_type, self.action.past_tense())
    }
}
