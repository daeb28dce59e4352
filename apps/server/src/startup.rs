//! Server startup tasks.

use chrono::Utc;
use serde_json::json;
use shorouk_models::{AuditAction, AuditRecord, CreateUserRequest, EntityType, Role, User};
use uuid::Uuid;

use crate::{auth::hash_password, config::Config, db::Store, Error, Result};

/// Creates the configured bootstrap administrator unless an account with that
/// username already exists. Without bootstrap credentials this is a no-op.
///
/// Returns the id of the account created, if any.
pub async fn ensure_bootstrap_admin(config: &Config, store: &dyn Store) -> Result<Option<Uuid>> {
    let bootstrap = &config.bootstrap;
    let (Some(username), Some(password)) = (
        bootstrap.admin_username.as_deref(),
        bootstrap.admin_password.as_deref(),
    ) else {
        tracing::debug!("No bootstrap administrator configured");
        return Ok(None);
    };

    if store.find_user_by_login(username).await?.is_some() {
        tracing::info!(username, "Bootstrap administrator already present");
        return Ok(None);
    }

    let request = CreateUserRequest {
        username: username.to_string(),
        email: bootstrap
            .admin_email
            .clone()
            .unwrap_or_else(|| format!("{username}@shorouk.local")),
        password: password.to_string(),
        role: Role::Admin.as_str().to_string(),
        full_name: bootstrap
            .admin_full_name
            .clone()
            .unwrap_or_else(|| "System Administrator".to_string()),
    };
    let new_user = request.into_new_user().map_err(|violations| {
        let fields: Vec<String> = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        Error::Internal(format!(
            "Invalid bootstrap administrator: {}",
            fields.join("; ")
        ))
    })?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: new_user.username,
        email: new_user.email,
        role: Role::Admin,
        full_name: new_user.full_name,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    };
    let password_hash = hash_password(&new_user.password)?;
    let audit = AuditRecord::new(AuditAction::Create, EntityType::User, user.id)
        .with_details(json!({ "username": user.username, "bootstrap": true }));

    let created = store.insert_user(user, password_hash, audit).await?;
    tracing::info!(
        user_id = %created.id,
        username = %created.username,
        "Bootstrap administrator created"
    );
    Ok(Some(created.id))
}
