//! HTTP middleware

pub mod auth;
pub mod request_id;
pub mod security;

pub use auth::require_auth;
pub use request_id::{discard_unsafe_request_id, record_request_id};
pub use security::security_headers_middleware;
