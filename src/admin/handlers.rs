use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use tracing::instrument;

use crate::{
    admin::{dto::AdminUserView, services},
    auth::extractors::StaffUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// GET /admin/users
#[instrument(skip_all, fields(staff_id = staff.id))]
pub async fn list_users(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
) -> ApiResult<Json<Vec<AdminUserView>>> {
    let users = services::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(AdminUserView::from).collect()))
}

/// GET /admin/users/:id
#[instrument(skip_all, fields(staff_id = staff.id))]
pub async fn get_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<AdminUserView>> {
    let Path(id) = path.map_err(|_| ApiError::NotFound)?;
    let user = services::get_user(&state.db, id).await?;
    Ok(Json(user.into()))
}
