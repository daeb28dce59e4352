use crate::api::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
}

pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).patch(users::update_user))
}
