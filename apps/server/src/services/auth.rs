//! Login, token refresh and bearer-token authentication.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shorouk_models::{AuditAction, AuditRecord, EntityType, FieldViolation, User};
use std::sync::Arc;

use crate::{
    auth::{AuthManager, Principal, TokenPair, TokenType},
    db::Store,
    Error, Result,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    /// Username or email address.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    auth: Arc<AuthManager>,
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("Invalid username or password".to_string())
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, auth: Arc<AuthManager>) -> Self {
        Self { store, auth }
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let login = request.username.trim();
        let mut missing = Vec::new();
        if login.is_empty() {
            missing.push(FieldViolation::new("username", "required", "username is required"));
        }
        if request.password.is_empty() {
            missing.push(FieldViolation::new("password", "required", "password is required"));
        }
        if !missing.is_empty() {
            return Err(Error::validation(missing));
        }

        let record = self
            .store
            .find_user_by_login(login)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !self.auth.verify_password(&request.password, &record.password_hash) {
            tracing::info!(user_id = %record.user.id, "Login rejected: wrong password");
            return Err(invalid_credentials());
        }
        if !record.user.is_active {
            tracing::info!(user_id = %record.user.id, "Login rejected: account inactive");
            return Err(Error::Unauthorized("Account is deactivated".to_string()));
        }

        let mut user = record.user;
        let tokens = self.auth.issue_tokens(&user)?;
        let now = Utc::now();
        let audit = AuditRecord::new(AuditAction::Login, EntityType::User, user.id)
            .by(user.id)
            .with_details(json!({ "username": user.username }));
        self.store.record_login(user.id, now, audit).await?;
        user.last_login_at = Some(now);

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(LoginResponse {
            token: tokens.token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user,
        })
    }

    /// Exchanges a refresh token for a new pair. The old refresh token stays
    /// valid until it expires; clients are expected to drop it.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<TokenPair> {
        let token = request.refresh_token.trim();
        if token.is_empty() {
            return Err(Error::invalid_field(
                "refresh_token",
                "required",
                "refresh_token is required",
            ));
        }
        let claims = self.auth.verify(token, TokenType::Refresh)?;
        let user = self.active_user(claims.sub).await?;
        self.auth.issue_tokens(&user)
    }

    /// Resolves a bearer access token into the calling principal.
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let claims = self.auth.verify(token, TokenType::Access)?;
        let user = self.active_user(claims.sub).await?;
        Ok(Principal {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    pub async fn me(&self, principal: &Principal) -> Result<User> {
        self.active_user(principal.user_id).await
    }

    async fn active_user(&self, id: uuid::Uuid) -> Result<User> {
        match self.store.find_user(id).await? {
            Some(record) if record.user.is_active => Ok(record.user),
            Some(_) => Err(Error::Unauthorized("Account is deactivated".to_string())),
            None => Err(Error::Unauthorized("Account no longer exists".to_string())),
        }
    }
}
