use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{CreateUserRequest, TokenRequest, TokenResponse, UpdateUserRequest, UserResponse},
        extractors::AuthUser,
        services::{self, NewAccount},
    },
    error::ApiResult,
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(create_token))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user/me", get(get_me).patch(patch_me).put(put_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(payload) = payload?;
    let account = NewAccount::validate(
        payload.email.as_deref(),
        payload.password.as_deref(),
        payload.name.as_deref(),
    )?;
    let user = services::create_user(&state.db, account).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let token = services::issue_token(
        &state.db,
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn patch_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(payload) = payload?;
    let updated = services::update_profile(&state.db, &user, payload.into(), true).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn put_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(payload) = payload?;
    let updated = services::update_profile(&state.db, &user, payload.into(), false).await?;
    Ok(Json(updated.into()))
}
