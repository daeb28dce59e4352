//! Storage abstraction behind the services.
//!
//! Every mutating method takes the [`AuditRecord`] describing it and must
//! persist both or neither. Uniqueness and reference checks happen inside the
//! same unit of work so that concurrent requests cannot slip past them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use shorouk_models::{
    AuditLogEntry, AuditRecord, FormStatus, Patient, PatientFields, Role, User, UserChanges,
    Visit, VisitStatus,
};
use uuid::Uuid;

use crate::Result;

/// A user together with its password hash. Never leaves the server.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Nurse,
    Doctor,
}

impl FormKind {
    pub fn table(&self) -> &'static str {
        match self {
            FormKind::Nurse => "nurse_forms",
            FormKind::Doctor => "doctor_forms",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormKind::Nurse => "Nurse form",
            FormKind::Doctor => "Doctor form",
        }
    }
}

/// Storage shape shared by nurse and doctor forms. `data` holds the
/// assessment or evaluation document.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRecord {
    pub id: Uuid,
    pub kind: FormKind,
    pub visit_id: Uuid,
    pub author_id: Uuid,
    pub status: FormStatus,
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Preconditions checked atomically when a form is inserted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormInsertRules {
    /// The visit must already carry a submitted nurse form.
    pub require_submitted_nurse_form: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct VisitFilter {
    pub status: Option<VisitStatus>,
    pub patient_id: Option<Uuid>,
    pub nurse_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct FormFilter {
    pub visit_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by the health probe.
    async fn ping(&self) -> Result<()>;

    async fn insert_user(
        &self,
        user: User,
        password_hash: String,
        audit: AuditRecord,
    ) -> Result<User>;
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>>;
    /// Looks a user up by username, or by email (case-insensitive).
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRecord>>;
    async fn list_users(&self, filter: &UserFilter) -> Result<(Vec<User>, i64)>;
    async fn update_user(
        &self,
        id: Uuid,
        changes: &UserChanges,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<User>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>, audit: AuditRecord) -> Result<()>;

    async fn insert_patient(&self, patient: Patient, audit: AuditRecord) -> Result<Patient>;
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>>;
    async fn list_patients(&self, filter: &PatientFilter) -> Result<(Vec<Patient>, i64)>;
    async fn update_patient(
        &self,
        id: Uuid,
        fields: &PatientFields,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<Patient>;

    /// Fails with a 422 on a dangling patient or a doctor that is not an active doctor.
    async fn insert_visit(&self, visit: Visit, audit: AuditRecord) -> Result<Visit>;
    async fn find_visit(&self, id: Uuid) -> Result<Option<Visit>>;
    async fn list_visits(&self, filter: &VisitFilter) -> Result<(Vec<Visit>, i64)>;
    /// Applies `next` only if the current status allows it.
    async fn transition_visit(
        &self,
        id: Uuid,
        next: VisitStatus,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<Visit>;

    async fn insert_form(
        &self,
        form: FormRecord,
        rules: FormInsertRules,
        audit: AuditRecord,
    ) -> Result<FormRecord>;
    async fn find_form(&self, kind: FormKind, id: Uuid) -> Result<Option<FormRecord>>;
    async fn list_forms(
        &self,
        kind: FormKind,
        filter: &FormFilter,
    ) -> Result<(Vec<FormRecord>, i64)>;
    /// Replaces the document of a draft owned by `author_id`.
    async fn update_form_data(
        &self,
        kind: FormKind,
        id: Uuid,
        author_id: Uuid,
        data: JsonValue,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<FormRecord>;
    async fn submit_form(
        &self,
        kind: FormKind,
        id: Uuid,
        author_id: Uuid,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<FormRecord>;

    /// Newest first.
    async fn list_audit_logs(&self, filter: &AuditFilter) -> Result<(Vec<AuditLogEntry>, i64)>;
}
