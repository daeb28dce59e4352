//! Read-only access to the audit trail.

use serde::{Deserialize, Serialize};
use shorouk_models::{AuditLogEntry, Role};
use std::sync::Arc;

use super::{trimmed, uuid_filter};
use crate::{
    auth::Principal,
    config::PaginationConfig,
    db::{AuditFilter, Store},
    Result,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogResponse {
    pub logs: Vec<AuditLogEntry>,
    pub total: i64,
}

pub struct AuditService {
    store: Arc<dyn Store>,
    pagination: PaginationConfig,
}

impl AuditService {
    pub fn new(store: Arc<dyn Store>, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }

    pub async fn list(&self, actor: &Principal, query: AuditLogQuery) -> Result<AuditLogResponse> {
        actor.require_role(&[Role::Admin])?;
        let (limit, offset) = self.pagination.resolve(query.limit, query.offset);

        // Stored actions and entity types are lowercase snake_case.
        let filter = AuditFilter {
            user_id: uuid_filter("user_id", query.user_id.as_deref())?,
            action: trimmed(query.action.as_deref()).map(|s| s.to_lowercase()),
            entity_type: trimmed(query.entity_type.as_deref()).map(|s| s.to_lowercase()),
            entity_id: uuid_filter("entity_id", query.entity_id.as_deref())?,
            limit,
            offset,
        };

        let (logs, total) = self.store.list_audit_logs(&filter).await?;
        Ok(AuditLogResponse { logs, total })
    }
}
