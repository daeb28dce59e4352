//! Password hashing, token issuance and the request-scoped caller identity.
//!
//! Access and refresh tokens are HS256 JWTs signed with the same secret and
//! told apart by their `typ` claim, so a refresh token can never be presented
//! as a bearer token and vice versa.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shorouk_models::{Role, User};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

use crate::{config::Config, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub typ: TokenType,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

pub struct AuthManager {
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthManager {
    pub fn new(config: Arc<Config>) -> Self {
        let secret = match &config.auth.jwt_secret {
            Some(s) if !s.is_empty() => s.as_bytes().to_vec(),
            _ => {
                tracing::warn!(
                    "`auth.jwt_secret` is not set; using ephemeral secret (tokens reset on restart)"
                );
                format!("{}{}", Uuid::new_v4(), Uuid::new_v4()).into_bytes()
            }
        };

        Self {
            config,
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash_password(password)
    }

    /// False for a wrong password and for a hash that cannot be parsed.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is unreadable");
                false
            }
        }
    }

    pub fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        let auth = &self.config.auth;
        Ok(TokenPair {
            token: self.sign(user, TokenType::Access, auth.access_token_ttl_seconds)?,
            refresh_token: self.sign(user, TokenType::Refresh, auth.refresh_token_ttl_seconds)?,
            expires_in: auth.access_token_ttl_seconds,
        })
    }

    fn sign(&self, user: &User, typ: TokenType, ttl_seconds: u64) -> Result<String> {
        let now = now_epoch_seconds();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            typ,
            iss: self.config.auth.issuer.clone(),
            iat: now,
            exp: now.saturating_add(ttl_seconds as usize),
            jti: Uuid::new_v4(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Decodes `token` and checks signature, expiry, issuer and token type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[self.config.auth.issuer.as_str()]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                Error::Unauthorized("Invalid or expired token".to_string())
            })?
            .claims;

        if claims.typ != expected {
            return Err(Error::Unauthorized(format!(
                "Expected a {} token",
                match expected {
                    TokenType::Access => "access",
                    TokenType::Refresh => "refresh",
                }
            )));
        }
        Ok(claims)
    }
}

/// Argon2id hash in PHC string format.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))
}

fn now_epoch_seconds() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}

/// The authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Principal {
    /// 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        let allowed: Vec<&str> = roles.iter().map(Role::as_str).collect();
        Err(Error::Forbidden(format!(
            "This action requires one of the roles: {}",
            allowed.join(", ")
        )))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))
    }
}
