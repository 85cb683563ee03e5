use sqlx::PgPool;

use crate::{
    auth::repo_types::User,
    error::{ApiError, ApiResult},
};

pub async fn list_users(db: &PgPool) -> ApiResult<Vec<User>> {
    Ok(User::list_all(db).await?)
}

pub async fn get_user(db: &PgPool, id: i64) -> ApiResult<User> {
    User::find_by_id(db, id).await?.ok_or(ApiError::NotFound)
}
