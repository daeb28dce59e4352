//! Patient registration and lookup.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shorouk_models::{AuditAction, AuditRecord, EntityType, Patient, PatientRequest, Role};
use std::sync::Arc;
use uuid::Uuid;

use super::{announce, trimmed, visits::VisitListResponse};
use crate::{
    auth::Principal,
    config::PaginationConfig,
    db::{PatientFilter, Store, VisitFilter},
    realtime::RealtimeHub,
    Error, Result,
};

const WRITE_ROLES: &[Role] = &[Role::Nurse, Role::Admin];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientListResponse {
    pub patients: Vec<Patient>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct PatientService {
    store: Arc<dyn Store>,
    hub: Arc<RealtimeHub>,
    pagination: PaginationConfig,
}

impl PatientService {
    pub fn new(store: Arc<dyn Store>, hub: Arc<RealtimeHub>, pagination: PaginationConfig) -> Self {
        Self {
            store,
            hub,
            pagination,
        }
    }

    pub async fn create(&self, actor: &Principal, request: PatientRequest) -> Result<Patient> {
        actor.require_role(WRITE_ROLES)?;
        let now = Utc::now();
        let fields = request.into_fields(now.date_naive())?;

        let patient = Patient {
            id: Uuid::new_v4(),
            full_name: fields.full_name,
            national_id: fields.national_id,
            medical_number: fields.medical_number,
            date_of_birth: fields.date_of_birth,
            gender: fields.gender,
            mobile_number: fields.mobile_number,
            address: fields.address,
            emergency_contact: fields.emergency_contact,
            created_at: now,
            updated_at: now,
        };
        let audit = AuditRecord::new(AuditAction::Create, EntityType::Patient, patient.id)
            .by(actor.user_id)
            .with_details(json!({ "medical_number": patient.medical_number }));

        let created = self.store.insert_patient(patient, audit.clone()).await?;
        announce(&self.hub, &audit);
        tracing::info!(patient_id = %created.id, actor = %actor.user_id, "Patient registered");
        Ok(created)
    }

    pub async fn list(&self, query: PatientListQuery) -> Result<PatientListResponse> {
        let (limit, offset) = self.pagination.resolve(query.limit, query.offset);
        let filter = PatientFilter {
            search: trimmed(query.search.as_deref()),
            limit,
            offset,
        };
        let (patients, total) = self.store.list_patients(&filter).await?;
        Ok(PatientListResponse { patients, total })
    }

    pub async fn get(&self, id: Uuid) -> Result<Patient> {
        self.store
            .find_patient(id)
            .await?
            .ok_or_else(|| Error::not_found("Patient", id))
    }

    pub async fn update(
        &self,
        actor: &Principal,
        id: Uuid,
        request: PatientRequest,
    ) -> Result<Patient> {
        actor.require_role(WRITE_ROLES)?;
        let now = Utc::now();
        let fields = request.into_fields(now.date_naive())?;

        let audit = AuditRecord::new(AuditAction::Update, EntityType::Patient, id)
            .by(actor.user_id)
            .with_details(json!({ "medical_number": fields.medical_number }));
        let updated = self
            .store
            .update_patient(id, &fields, now, audit.clone())
            .await?;
        announce(&self.hub, &audit);
        tracing::info!(patient_id = %id, actor = %actor.user_id, "Patient updated");
        Ok(updated)
    }

    /// Visits of one patient, newest first.
    pub async fn visits(&self, id: Uuid, query: PageQuery) -> Result<VisitListResponse> {
        self.get(id).await?;
        let (limit, offset) = self.pagination.resolve(query.limit, query.offset);
        let filter = VisitFilter {
            patient_id: Some(id),
            limit,
            offset,
            ..Default::default()
        };
        let (visits, total) = self.store.list_visits(&filter).await?;
        Ok(VisitListResponse { visits, total })
    }
}
