//! Business logic layer
//!
//! Services enforce role checks, turn validated requests into store calls,
//! and announce committed changes on the real-time channel.

pub mod audit;
pub mod auth;
pub mod forms;
pub mod health;
pub mod patients;
pub mod users;
pub mod visits;

pub use audit::AuditService;
pub use auth::AuthService;
pub use forms::FormService;
pub use health::HealthService;
pub use patients::PatientService;
pub use users::UserService;
pub use visits::VisitService;

use chrono::Utc;
use shorouk_models::AuditRecord;
use uuid::Uuid;

use crate::{
    realtime::{RealtimeEvent, RealtimeHub},
    Error, Result,
};

/// Publishes the event for a mutation that has just committed.
pub(crate) fn announce(hub: &RealtimeHub, record: &AuditRecord) {
    hub.publish(RealtimeEvent::from_audit(record, Utc::now()));
}

/// Trims a query parameter, treating blank values as absent.
pub(crate) fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Parses an optional UUID filter, rejecting malformed values with a 422.
pub(crate) fn uuid_filter(field: &str, value: Option<&str>) -> Result<Option<Uuid>> {
    match trimmed(value) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|_| Error::invalid_field(field, "format", format!("{field} must be a UUID"))),
    }
}

/// Path identifiers that are not UUIDs cannot name an existing entity.
pub fn parse_path_id(entity: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::not_found(entity, raw))
}
