//! Nurse assessments and doctor evaluations.
//!
//! Both form kinds share one storage shape ([`FormRecord`]); this service owns
//! the typed views and the draft -> submitted lifecycle.

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use shorouk_models::{
    AssessmentData, AuditAction, AuditRecord, CreateDoctorFormRequest, CreateNurseFormRequest,
    DoctorForm, EntityType, EvaluationData, FormStatus, NurseForm, Role, UpdateDoctorFormRequest,
    UpdateNurseFormRequest,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{announce, uuid_filter};
use crate::{
    auth::Principal,
    config::{PaginationConfig, WorkflowConfig},
    db::{FormFilter, FormInsertRules, FormKind, FormRecord, Store},
    realtime::RealtimeHub,
    Error, Result,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormListQuery {
    pub visit_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NurseFormListResponse {
    pub nurse_forms: Vec<NurseForm>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorFormListResponse {
    pub doctor_forms: Vec<DoctorForm>,
    pub total: i64,
}

fn entity_type(kind: FormKind) -> EntityType {
    match kind {
        FormKind::Nurse => EntityType::NurseForm,
        FormKind::Doctor => EntityType::DoctorForm,
    }
}

fn encode<T: Serialize>(data: &T) -> Result<JsonValue> {
    serde_json::to_value(data).map_err(|e| Error::Internal(format!("Failed to encode form: {e}")))
}

fn decode<T: DeserializeOwned>(record: &FormRecord) -> Result<T> {
    serde_json::from_value(record.data.clone()).map_err(|e| {
        Error::Internal(format!(
            "Stored {} {} is unreadable: {e}",
            record.kind.label().to_lowercase(),
            record.id
        ))
    })
}

fn nurse_form(record: FormRecord) -> Result<NurseForm> {
    Ok(NurseForm {
        assessment_data: decode::<AssessmentData>(&record)?,
        id: record.id,
        visit_id: record.visit_id,
        nurse_id: record.author_id,
        status: record.status,
        created_at: record.created_at,
        updated_at: record.updated_at,
        submitted_at: record.submitted_at,
    })
}

fn doctor_form(record: FormRecord) -> Result<DoctorForm> {
    Ok(DoctorForm {
        evaluation_data: decode::<EvaluationData>(&record)?,
        id: record.id,
        visit_id: record.visit_id,
        doctor_id: record.author_id,
        status: record.status,
        created_at: record.created_at,
        updated_at: record.updated_at,
        submitted_at: record.submitted_at,
    })
}

pub struct FormService {
    store: Arc<dyn Store>,
    hub: Arc<RealtimeHub>,
    pagination: PaginationConfig,
    workflow: WorkflowConfig,
}

impl FormService {
    pub fn new(
        store: Arc<dyn Store>,
        hub: Arc<RealtimeHub>,
        pagination: PaginationConfig,
        workflow: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            hub,
            pagination,
            workflow,
        }
    }

    pub async fn create_nurse_form(
        &self,
        actor: &Principal,
        request: CreateNurseFormRequest,
    ) -> Result<NurseForm> {
        actor.require_role(&[Role::Nurse, Role::Admin])?;
        let new_form = request.into_new_form()?;
        let data = encode(&new_form.assessment_data)?;
        let record = self
            .insert(
                actor,
                FormKind::Nurse,
                new_form.visit_id,
                data,
                FormInsertRules::default(),
            )
            .await?;
        nurse_form(record)
    }

    pub async fn get_nurse_form(&self, id: Uuid) -> Result<NurseForm> {
        nurse_form(self.find(FormKind::Nurse, id).await?)
    }

    pub async fn list_nurse_forms(&self, query: FormListQuery) -> Result<NurseFormListResponse> {
        let (records, total) = self.list(FormKind::Nurse, query).await?;
        let nurse_forms = records
            .into_iter()
            .map(nurse_form)
            .collect::<Result<Vec<_>>>()?;
        Ok(NurseFormListResponse { nurse_forms, total })
    }

    pub async fn update_nurse_form(
        &self,
        actor: &Principal,
        id: Uuid,
        request: UpdateNurseFormRequest,
    ) -> Result<NurseForm> {
        actor.require_role(&[Role::Nurse, Role::Admin])?;
        let data = encode(&request.into_assessment()?)?;
        nurse_form(self.replace(actor, FormKind::Nurse, id, data).await?)
    }

    pub async fn submit_nurse_form(&self, actor: &Principal, id: Uuid) -> Result<NurseForm> {
        actor.require_role(&[Role::Nurse, Role::Admin])?;
        nurse_form(self.submit(actor, FormKind::Nurse, id).await?)
    }

    pub async fn create_doctor_form(
        &self,
        actor: &Principal,
        request: CreateDoctorFormRequest,
    ) -> Result<DoctorForm> {
        actor.require_role(&[Role::Doctor, Role::Admin])?;
        let new_form = request.into_new_form()?;
        let data = encode(&new_form.evaluation_data)?;
        let rules = FormInsertRules {
            require_submitted_nurse_form: self.workflow.require_nurse_form_before_doctor_form,
        };
        let record = self
            .insert(actor, FormKind::Doctor, new_form.visit_id, data, rules)
            .await?;
        doctor_form(record)
    }

    pub async fn get_doctor_form(&self, id: Uuid) -> Result<DoctorForm> {
        doctor_form(self.find(FormKind::Doctor, id).await?)
    }

    pub async fn list_doctor_forms(&self, query: FormListQuery) -> Result<DoctorFormListResponse> {
        let (records, total) = self.list(FormKind::Doctor, query).await?;
        let doctor_forms = records
            .into_iter()
            .map(doctor_form)
            .collect::<Result<Vec<_>>>()?;
        Ok(DoctorFormListResponse {
            doctor_forms,
            total,
        })
    }

    pub async fn update_doctor_form(
        &self,
        actor: &Principal,
        id: Uuid,
        request: UpdateDoctorFormRequest,
    ) -> Result<DoctorForm> {
        actor.require_role(&[Role::Doctor, Role::Admin])?;
        let data = encode(&request.into_evaluation()?)?;
        doctor_form(self.replace(actor, FormKind::Doctor, id, data).await?)
    }

    pub async fn submit_doctor_form(&self, actor: &Principal, id: Uuid) -> Result<DoctorForm> {
        actor.require_role(&[Role::Doctor, Role::Admin])?;
        doctor_form(self.submit(actor, FormKind::Doctor, id).await?)
    }

    async fn insert(
        &self,
        actor: &Principal,
        kind: FormKind,
        visit_id: Uuid,
        data: JsonValue,
        rules: FormInsertRules,
    ) -> Result<FormRecord> {
        let now = Utc::now();
        let record = FormRecord {
            id: Uuid::new_v4(),
            kind,
            visit_id,
            author_id: actor.user_id,
            status: FormStatus::Draft,
            data,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        };
        let audit = AuditRecord::new(AuditAction::Create, entity_type(kind), record.id)
            .by(actor.user_id)
            .with_details(json!({ "visit_id": visit_id }));

        let created = self.store.insert_form(record, rules, audit.clone()).await?;
        announce(&self.hub, &audit);
        tracing::info!(
            form_id = %created.id,
            visit_id = %visit_id,
            actor = %actor.user_id,
            "{} created",
            kind.label()
        );
        Ok(created)
    }

    async fn find(&self, kind: FormKind, id: Uuid) -> Result<FormRecord> {
        self.store
            .find_form(kind, id)
            .await?
            .ok_or_else(|| Error::not_found(kind.label(), id))
    }

    async fn list(&self, kind: FormKind, query: FormListQuery) -> Result<(Vec<FormRecord>, i64)> {
        let (limit, offset) = self.pagination.resolve(query.limit, query.offset);
        let filter = FormFilter {
            visit_id: uuid_filter("visit_id", query.visit_id.as_deref())?,
            limit,
            offset,
        };
        self.store.list_forms(kind, &filter).await
    }

    async fn replace(
        &self,
        actor: &Principal,
        kind: FormKind,
        id: Uuid,
        data: JsonValue,
    ) -> Result<FormRecord> {
        let audit = AuditRecord::new(AuditAction::Update, entity_type(kind), id).by(actor.user_id);
        let updated = self
            .store
            .update_form_data(kind, id, actor.user_id, data, Utc::now(), audit.clone())
            .await?;
        announce(&self.hub, &audit);
        tracing::info!(form_id = %id, actor = %actor.user_id, "{} updated", kind.label());
        Ok(updated)
    }

    async fn submit(&self, actor: &Principal, kind: FormKind, id: Uuid) -> Result<FormRecord> {
        let audit = AuditRecord::new(AuditAction::Submit, entity_type(kind), id).by(actor.user_id);
        let submitted = self
            .store
            .submit_form(kind, id, actor.user_id, Utc::now(), audit.clone())
            .await?;
        announce(&self.hub, &audit);
        tracing::info!(form_id = %id, actor = %actor.user_id, "{} submitted", kind.label());
        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(kind: FormKind, data: JsonValue) -> FormRecord {
        let now = Utc::now();
        FormRecord {
            id: Uuid::new_v4(),
            kind,
            visit_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            status: FormStatus::Draft,
            data,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }

    #[test]
    fn author_id_maps_to_the_kind_specific_field() {
        let stored = record(
            FormKind::Nurse,
            json!({ "basic_info": { "chief_complaint": "Headache" } }),
        );
        let author = stored.author_id;
        let form = nurse_form(stored).unwrap();
        assert_eq!(form.nurse_id, author);
        assert_eq!(
            form.assessment_data.basic_info.chief_complaint.as_deref(),
            Some("Headache")
        );

        let stored = record(FormKind::Doctor, json!({}));
        let author = stored.author_id;
        assert_eq!(doctor_form(stored).unwrap().doctor_id, author);
    }

    #[test]
    fn unreadable_documents_are_internal_errors() {
        let stored = record(FormKind::Nurse, json!({ "basic_info": 5 }));
        assert!(matches!(nurse_form(stored), Err(Error::Internal(_))));
    }
}
