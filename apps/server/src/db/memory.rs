//! Process-local `Store` used by tests and `database.backend = memory`.
//!
//! All state sits behind one lock; every method holds it for its whole unit
//! of work, which gives the same atomicity as a database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use shorouk_models::{
    AuditLogEntry, AuditRecord, FormStatus, Patient, PatientFields, User, UserChanges, Visit,
    VisitStatus,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    guards,
    traits::{
        AuditFilter, FormFilter, FormInsertRules, FormKind, FormRecord, PatientFilter, Store,
        UserFilter, UserRecord, VisitFilter,
    },
};
use crate::{Error, Result};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    patients: HashMap<Uuid, Patient>,
    visits: HashMap<Uuid, Visit>,
    nurse_forms: HashMap<Uuid, FormRecord>,
    doctor_forms: HashMap<Uuid, FormRecord>,
    audit_log: Vec<AuditLogEntry>,
}

impl Inner {
    fn forms(&self, kind: FormKind) -> &HashMap<Uuid, FormRecord> {
        match kind {
            FormKind::Nurse => &self.nurse_forms,
            FormKind::Doctor => &self.doctor_forms,
        }
    }

    fn forms_mut(&mut self, kind: FormKind) -> &mut HashMap<Uuid, FormRecord> {
        match kind {
            FormKind::Nurse => &mut self.nurse_forms,
            FormKind::Doctor => &mut self.doctor_forms,
        }
    }

    fn append_audit(&mut self, record: AuditRecord, at: DateTime<Utc>) {
        let id = self.audit_log.len() as i64 + 1;
        self.audit_log.push(AuditLogEntry {
            id,
            user_id: record.user_id,
            action: record.action.as_str().to_string(),
            entity_type: record.entity_type.as_str().to_string(),
            entity_id: Some(record.entity_id),
            details: record.details,
            created_at: at,
        });
    }

    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|r| r.user.username == username && Some(r.user.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|r| r.user.email.eq_ignore_ascii_case(email) && Some(r.user.id) != except)
    }

    fn medical_number_taken(&self, medical_number: &str, except: Option<Uuid>) -> bool {
        self.patients
            .values()
            .any(|p| p.medical_number == medical_number && Some(p.id) != except)
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    (items, total)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        let _guard = self.inner.read().await;
        Ok(())
    }

    async fn insert_user(
        &self,
        user: User,
        password_hash: String,
        audit: AuditRecord,
    ) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner.username_taken(&user.username, None) {
            return Err(guards::duplicate_username(&user.username));
        }
        if inner.email_taken(&user.email, None) {
            return Err(guards::duplicate_email(&user.email));
        }
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash,
            },
        );
        inner.append_audit(audit, user.created_at);
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRecord>> {
        let inner = self.inner.read().await;
        let by_username = inner.users.values().find(|r| r.user.username == login);
        let found = by_username.or_else(|| {
            inner
                .users
                .values()
                .find(|r| r.user.email.eq_ignore_ascii_case(login))
        });
        Ok(found.cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<(Vec<User>, i64)> {
        let inner = self.inner.read().await;
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut users: Vec<User> = inner
            .users
            .values()
            .map(|r| &r.user)
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .filter(|u| filter.is_active.map_or(true, |active| u.is_active == active))
            .filter(|u| {
                needle.as_deref().map_or(true, |n| {
                    contains_ci(&u.username, n)
                        || contains_ci(&u.full_name, n)
                        || contains_ci(&u.email, n)
                })
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(page(users, filter.limit, filter.offset))
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: &UserChanges,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Err(Error::not_found("User", id));
        }
        if let Some(email) = changes.email.as_deref() {
            if inner.email_taken(email, Some(id)) {
                return Err(guards::duplicate_email(email));
            }
        }

        let record = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("User", id))?;
        let user = &mut record.user;
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = at;
        let updated = user.clone();

        inner.append_audit(audit, at);
        Ok(updated)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>, audit: AuditRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("User", id))?;
        record.user.last_login_at = Some(at);
        inner.append_audit(audit, at);
        Ok(())
    }

    async fn insert_patient(&self, patient: Patient, audit: AuditRecord) -> Result<Patient> {
        let mut inner = self.inner.write().await;
        if inner.medical_number_taken(&patient.medical_number, None) {
            return Err(guards::duplicate_medical_number(&patient.medical_number));
        }
        inner.patients.insert(patient.id, patient.clone());
        inner.append_audit(audit, patient.created_at);
        Ok(patient)
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>> {
        Ok(self.inner.read().await.patients.get(&id).cloned())
    }

    async fn list_patients(&self, filter: &PatientFilter) -> Result<(Vec<Patient>, i64)> {
        let inner = self.inner.read().await;
        let term = filter.search.as_deref().unwrap_or_default();
        let mut patients: Vec<Patient> = inner
            .patients
            .values()
            .filter(|p| p.matches_search(term))
            .cloned()
            .collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(page(patients, filter.limit, filter.offset))
    }

    async fn update_patient(
        &self,
        id: Uuid,
        fields: &PatientFields,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<Patient> {
        let mut inner = self.inner.write().await;
        if !inner.patients.contains_key(&id) {
            return Err(Error::not_found("Patient", id));
        }
        if inner.medical_number_taken(&fields.medical_number, Some(id)) {
            return Err(guards::duplicate_medical_number(&fields.medical_number));
        }
        let patient = inner
            .patients
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Patient", id))?;
        patient.full_name = fields.full_name.clone();
        patient.national_id = fields.national_id.clone();
        patient.medical_number = fields.medical_number.clone();
        patient.date_of_birth = fields.date_of_birth;
        patient.gender = fields.gender;
        patient.mobile_number = fields.mobile_number.clone();
        patient.address = fields.address.clone();
        patient.emergency_contact = fields.emergency_contact.clone();
        patient.updated_at = at;
        let updated = patient.clone();

        inner.append_audit(audit, at);
        Ok(updated)
    }

    async fn insert_visit(&self, visit: Visit, audit: AuditRecord) -> Result<Visit> {
        let mut inner = self.inner.write().await;
        guards::patient_exists(inner.patients.contains_key(&visit.patient_id), visit.patient_id)?;
        guards::assignable_doctor(
            inner.users.get(&visit.doctor_id).map(|r| &r.user),
            visit.doctor_id,
        )?;
        inner.visits.insert(visit.id, visit.clone());
        inner.append_audit(audit, visit.created_at);
        Ok(visit)
    }

    async fn find_visit(&self, id: Uuid) -> Result<Option<Visit>> {
        Ok(self.inner.read().await.visits.get(&id).cloned())
    }

    async fn list_visits(&self, filter: &VisitFilter) -> Result<(Vec<Visit>, i64)> {
        let inner = self.inner.read().await;
        let mut visits: Vec<Visit> = inner
            .visits
            .values()
            .filter(|v| filter.status.map_or(true, |s| v.status == s))
            .filter(|v| filter.patient_id.map_or(true, |id| v.patient_id == id))
            .filter(|v| filter.nurse_id.map_or(true, |id| v.nurse_id == id))
            .filter(|v| filter.doctor_id.map_or(true, |id| v.doctor_id == id))
            .cloned()
            .collect();
        visits.sort_by(|a, b| {
            b.visit_date
                .cmp(&a.visit_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(page(visits, filter.limit, filter.offset))
    }

    async fn transition_visit(
        &self,
        id: Uuid,
        next: VisitStatus,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<Visit> {
        let mut inner = self.inner.write().await;
        let visit = inner
            .visits
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Visit", id))?;
        guards::transition(visit.status, next)?;
        visit.status = next;
        visit.updated_at = at;
        let updated = visit.clone();

        inner.append_audit(audit, at);
        Ok(updated)
    }

    async fn insert_form(
        &self,
        form: FormRecord,
        rules: FormInsertRules,
        audit: AuditRecord,
    ) -> Result<FormRecord> {
        let mut inner = self.inner.write().await;
        guards::visit_accepts_forms(inner.visits.get(&form.visit_id), form.visit_id)?;
        if rules.require_submitted_nurse_form {
            let has_submitted = inner
                .nurse_forms
                .values()
                .any(|f| f.visit_id == form.visit_id && f.status == FormStatus::Submitted);
            guards::nurse_form_submitted(has_submitted, form.visit_id)?;
        }
        inner.forms_mut(form.kind).insert(form.id, form.clone());
        inner.append_audit(audit, form.created_at);
        Ok(form)
    }

    async fn find_form(&self, kind: FormKind, id: Uuid) -> Result<Option<FormRecord>> {
        Ok(self.inner.read().await.forms(kind).get(&id).cloned())
    }

    async fn list_forms(
        &self,
        kind: FormKind,
        filter: &FormFilter,
    ) -> Result<(Vec<FormRecord>, i64)> {
        let inner = self.inner.read().await;
        let mut forms: Vec<FormRecord> = inner
            .forms(kind)
            .values()
            .filter(|f| filter.visit_id.map_or(true, |id| f.visit_id == id))
            .cloned()
            .collect();
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(page(forms, filter.limit, filter.offset))
    }

    async fn update_form_data(
        &self,
        kind: FormKind,
        id: Uuid,
        author_id: Uuid,
        data: JsonValue,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<FormRecord> {
        let mut inner = self.inner.write().await;
        guards::form_editable(inner.forms(kind).get(&id), kind, id, author_id)?;
        let form = inner
            .forms_mut(kind)
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(kind.label(), id))?;
        form.data = data;
        form.updated_at = at;
        let updated = form.clone();

        inner.append_audit(audit, at);
        Ok(updated)
    }

    async fn submit_form(
        &self,
        kind: FormKind,
        id: Uuid,
        author_id: Uuid,
        at: DateTime<Utc>,
        audit: AuditRecord,
    ) -> Result<FormRecord> {
        let mut inner = self.inner.write().await;
        guards::form_editable(inner.forms(kind).get(&id), kind, id, author_id)?;
        let form = inner
            .forms_mut(kind)
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(kind.label(), id))?;
        form.status = FormStatus::Submitted;
        form.submitted_at = Some(at);
        form.updated_at = at;
        let updated = form.clone();

        inner.append_audit(audit, at);
        Ok(updated)
    }

    async fn list_audit_logs(&self, filter: &AuditFilter) -> Result<(Vec<AuditLogEntry>, i64)> {
        let inner = self.inner.read().await;
        let entries: Vec<AuditLogEntry> = inner
            .audit_log
            .iter()
            .rev()
            .filter(|e| filter.user_id.map_or(true, |id| e.user_id == Some(id)))
            .filter(|e| filter.action.as_deref().map_or(true, |a| e.action == a))
            .filter(|e| {
                filter
                    .entity_type
                    .as_deref()
                    .map_or(true, |t| e.entity_type == t)
            })
            .filter(|e| filter.entity_id.map_or(true, |id| e.entity_id == Some(id)))
            .cloned()
            .collect();
        Ok(page(entries, filter.limit, filter.offset))
    }
}
