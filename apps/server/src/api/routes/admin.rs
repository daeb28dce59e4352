use crate::api::handlers::{admin, realtime};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn public_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/health", get(admin::health))
        // Authenticates through the `token` query parameter.
        .route("/ws", get(realtime::subscribe))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Audit log (read-only, entries are immutable)
        .route("/admin/audit-logs", get(admin::list_audit_logs))
}
