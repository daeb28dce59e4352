//! Visit intake and status lifecycle.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shorouk_models::{
    AuditAction, AuditRecord, CreateVisitRequest, EntityType, Role, StatusChangeRequest, Visit,
    VisitStatus,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{announce, trimmed, uuid_filter};
use crate::{
    auth::Principal,
    config::PaginationConfig,
    db::{Store, VisitFilter},
    realtime::RealtimeHub,
    Error, Result,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitListQuery {
    pub status: Option<String>,
    pub patient_id: Option<String>,
    pub nurse_id: Option<String>,
    pub doctor_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitListResponse {
    pub visits: Vec<Visit>,
    pub total: i64,
}

pub struct VisitService {
    store: Arc<dyn Store>,
    hub: Arc<RealtimeHub>,
    pagination: PaginationConfig,
}

impl VisitService {
    pub fn new(store: Arc<dyn Store>, hub: Arc<RealtimeHub>, pagination: PaginationConfig) -> Self {
        Self {
            store,
            hub,
            pagination,
        }
    }

    /// Opens a visit. The caller becomes the visit's nurse.
    pub async fn create(&self, actor: &Principal, request: CreateVisitRequest) -> Result<Visit> {
        actor.require_role(&[Role::Nurse, Role::Admin])?;
        let new_visit = request.into_new_visit()?;

        let now = Utc::now();
        let visit = Visit {
            id: Uuid::new_v4(),
            patient_id: new_visit.patient_id,
            nurse_id: actor.user_id,
            doctor_id: new_visit.doctor_id,
            arrival_mode: new_visit.arrival_mode,
            chief_complaint: new_visit.chief_complaint,
            status: VisitStatus::Created,
            visit_date: new_visit.visit_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        let audit = AuditRecord::new(AuditAction::Create, EntityType::Visit, visit.id)
            .by(actor.user_id)
            .with_details(json!({
                "patient_id": visit.patient_id,
                "doctor_id": visit.doctor_id,
            }));

        let created = self.store.insert_visit(visit, audit.clone()).await?;
        announce(&self.hub, &audit);
        tracing::info!(
            visit_id = %created.id,
            patient_id = %created.patient_id,
            actor = %actor.user_id,
            "Visit created"
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Visit> {
        self.store
            .find_visit(id)
            .await?
            .ok_or_else(|| Error::not_found("Visit", id))
    }

    pub async fn list(&self, query: VisitListQuery) -> Result<VisitListResponse> {
        let (limit, offset) = self.pagination.resolve(query.limit, query.offset);
        let status = match trimmed(query.status.as_deref()) {
            Some(raw) => Some(
                raw.parse::<VisitStatus>()
                    .map_err(|e| Error::invalid_field("status", "enum", e.to_string()))?,
            ),
            None => None,
        };
        let filter = VisitFilter {
            status,
            patient_id: uuid_filter("patient_id", query.patient_id.as_deref())?,
            nurse_id: uuid_filter("nurse_id", query.nurse_id.as_deref())?,
            doctor_id: uuid_filter("doctor_id", query.doctor_id.as_deref())?,
            limit,
            offset,
        };
        let (visits, total) = self.store.list_visits(&filter).await?;
        Ok(VisitListResponse { visits, total })
    }

    pub async fn change_status(
        &self,
        actor: &Principal,
        id: Uuid,
        request: StatusChangeRequest,
    ) -> Result<Visit> {
        actor.require_role(&[Role::Nurse, Role::Doctor, Role::Admin])?;
        let next = request.into_status()?;

        let audit = AuditRecord::new(AuditAction::StatusChange, EntityType::Visit, id)
            .by(actor.user_id)
            .with_details(json!({ "status": next }));
        let updated = self
            .store
            .transition_visit(id, next, Utc::now(), audit.clone())
            .await?;
        announce(&self.hub, &audit);
        tracing::info!(
            visit_id = %id,
            status = %next,
            actor = %actor.user_id,
            "Visit status changed"
        );
        Ok(updated)
    }
}
