//! Route tables for `/api/v1`.

mod admin;
mod clinical;
mod staff;

use crate::state::AppState;
use axum::Router;

pub use admin::{admin_routes, public_admin_routes};
pub use clinical::clinical_routes;
pub use staff::{public_auth_routes, staff_routes};

/// Routes reachable without a bearer token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(public_auth_routes())
        .merge(public_admin_routes())
}

/// Routes that require an authenticated principal.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(staff_routes())
        .merge(clinical_routes())
        .merge(admin_routes())
}
