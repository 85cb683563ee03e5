pub mod dto;
pub mod filters;
pub mod handlers;
pub mod images;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::attr_routes())
        .merge(handlers::recipe_routes(max_upload_bytes))
}
