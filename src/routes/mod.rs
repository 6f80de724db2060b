pub mod admin;
pub mod pages;
pub mod waitlist;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Public script-compatible endpoint at `/` plus the admin API. Rate limiting,
/// CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(waitlist::handle_get).post(waitlist::handle_submission),
        )
        .nest("/api/admin", admin::routes())
        .with_state(state)
}
