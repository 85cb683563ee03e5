//! Staff-only user management.

pub mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(handlers::list_users))
        .route("/admin/users/:id", get(handlers::get_user))
}
