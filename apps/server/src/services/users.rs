//! Staff account administration.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shorouk_models::{
    AuditAction, AuditRecord, CreateUserRequest, EntityType, Role, UpdateUserRequest, User,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{announce, trimmed};
use crate::{
    auth::{AuthManager, Principal},
    config::PaginationConfig,
    db::{Store, UserFilter},
    realtime::RealtimeHub,
    Error, Result,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: i64,
}

pub struct UserService {
    store: Arc<dyn Store>,
    auth: Arc<AuthManager>,
    hub: Arc<RealtimeHub>,
    pagination: PaginationConfig,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        auth: Arc<AuthManager>,
        hub: Arc<RealtimeHub>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            store,
            auth,
            hub,
            pagination,
        }
    }

    pub async fn create(&self, actor: &Principal, request: CreateUserRequest) -> Result<User> {
        actor.require_role(&[Role::Admin])?;
        let new_user = request.into_new_user()?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            role: new_user.role,
            full_name: new_user.full_name,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        let password_hash = self.auth.hash_password(&new_user.password)?;
        let audit = AuditRecord::new(AuditAction::Create, EntityType::User, user.id)
            .by(actor.user_id)
            .with_details(json!({ "username": user.username, "role": user.role }));

        let created = self
            .store
            .insert_user(user, password_hash, audit.clone())
            .await?;
        announce(&self.hub, &audit);
        tracing::info!(user_id = %created.id, role = %created.role, "User created");
        Ok(created)
    }

    pub async fn list(&self, actor: &Principal, query: UserListQuery) -> Result<UserListResponse> {
        actor.require_role(&[Role::Admin])?;
        let (limit, offset) = self.pagination.resolve(query.limit, query.offset);

        let role = match trimmed(query.role.as_deref()) {
            Some(raw) => Some(
                raw.parse::<Role>()
                    .map_err(|e| Error::invalid_field("role", "enum", e.to_string()))?,
            ),
            None => None,
        };
        let filter = UserFilter {
            role,
            is_active: query.is_active,
            search: trimmed(query.search.as_deref()),
            limit,
            offset,
        };

        let (users, total) = self.store.list_users(&filter).await?;
        Ok(UserListResponse { users, total })
    }

    pub async fn get(&self, actor: &Principal, id: Uuid) -> Result<User> {
        if actor.user_id != id {
            actor.require_role(&[Role::Admin])?;
        }
        self.store
            .find_user(id)
            .await?
            .map(|r| r.user)
            .ok_or_else(|| Error::not_found("User", id))
    }

    pub async fn update(
        &self,
        actor: &Principal,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<User> {
        actor.require_role(&[Role::Admin])?;
        let changes = request.into_changes()?;

        if actor.user_id == id && changes.is_active == Some(false) {
            return Err(Error::invalid_field(
                "is_active",
                "self",
                "administrators cannot deactivate their own account",
            ));
        }

        let audit = AuditRecord::new(AuditAction::Update, EntityType::User, id)
            .by(actor.user_id)
            .with_details(json!({
                "email": changes.email,
                "full_name": changes.full_name,
                "role": changes.role,
                "is_active": changes.is_active,
            }));
        let updated = self
            .store
            .update_user(id, &changes, Utc::now(), audit.clone())
            .await?;
        announce(&self.hub, &audit);
        tracing::info!(user_id = %id, actor = %actor.user_id, "User updated");
        Ok(updated)
    }
}
