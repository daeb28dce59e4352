//! Staff accounts and their roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{password_weakness, FieldViolation, Violations, USERNAME_RE};
use crate::ParseEnumError;

/// Staff role. Drives every authorization decision in the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Nurse,
    Doctor,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Nurse, Role::Doctor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Nurse => "nurse",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "nurse" => Ok(Role::Nurse),
            // "physician" is the legacy name used by the first deployment.
            "doctor" | "physician" => Ok(Role::Doctor),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// A user as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// `POST /users` payload.
///
/// Every field defaults to empty so a missing field is reported as a field
/// violation rather than as a body parse failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(regex(
        path = *USERNAME_RE,
        message = "username must be 3-32 characters of letters, digits, '_', '.' or '-'"
    ))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "full_name must be 1-255 characters"))]
    pub full_name: String,
}

/// Validated input for account creation. `password` is still plaintext here;
/// hashing belongs to the auth layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        violations.check("", &self);

        if self.full_name.trim().is_empty() && !self.full_name.is_empty() {
            violations.push("full_name", "length", "full_name must not be blank");
        }
        if let Some(reason) = password_weakness(&self.password) {
            violations.push("password", "strength", reason);
        }
        let role = match self.role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                violations.push("role", "enum", e.to_string());
                None
            }
        };

        let new_user = NewUser {
            username: self.username,
            email: self.email.trim().to_string(),
            password: self.password,
            role: role.unwrap_or(Role::Nurse),
            full_name: self.full_name.trim().to_string(),
        };
        violations.finish(new_user)
    }
}

/// `PATCH /users/{id}` payload. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255, message = "full_name must be 1-255 characters"))]
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> Result<UserChanges, Vec<FieldViolation>> {
        let mut violations = Violations::new();
        violations.check("", &self);

        let role = match self.role.as_deref().map(str::parse::<Role>) {
            Some(Ok(role)) => Some(role),
            Some(Err(e)) => {
                violations.push("role", "enum", e.to_string());
                None
            }
            None => None,
        };
        if self
            .full_name
            .as_deref()
            .is_some_and(|n| !n.is_empty() && n.trim().is_empty())
        {
            violations.push("full_name", "length", "full_name must not be blank");
        }

        let changes = UserChanges {
            email: self.email.map(|e| e.trim().to_string()),
            full_name: self.full_name.map(|n| n.trim().to_string()),
            role,
            is_active: self.is_active,
        };
        if changes.is_empty() {
            violations.push("body", "empty", "at least one field must be provided");
        }
        violations.finish(changes)
    }
}
