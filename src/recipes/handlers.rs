use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{auth::extractors::AuthUser, error::ApiError, error::ApiResult, state::AppState};

use super::{
    dto::{AttrRequest, RecipeAction, RecipeRequest, RecipeView},
    filters::{parse_assigned_only, AttrListQuery, RecipeFilter, RecipeListQuery},
    repo_types::{Attr, AttrKind},
    services,
};

// --- public routers ---

pub fn attr_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/tags", get(list_tags).post(create_tag))
        .route(
            "/recipe/ingredients",
            get(list_ingredients).post(create_ingredient),
        )
}

pub fn recipe_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipe/recipes/:id",
            get(get_recipe)
                .patch(patch_recipe)
                .put(put_recipe)
                .delete(delete_recipe),
        )
        .route("/recipe/recipes/:id/image", get(get_recipe_image))
        .route(
            "/recipe/recipes/:id/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

/// Ids that do not parse can never match an owned recipe.
fn recipe_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

// --- tags and ingredients ---

async fn list_attrs(
    state: &AppState,
    kind: AttrKind,
    user_id: i64,
    query: Result<Query<AttrListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Attr>>> {
    let Query(query) = query?;
    let assigned_only = parse_assigned_only(query.assigned_only.as_deref())?;
    let attrs = services::list_attrs(state, kind, user_id, assigned_only).await?;
    Ok(Json(attrs))
}

async fn create_attr(
    state: &AppState,
    kind: AttrKind,
    user_id: i64,
    payload: Result<Json<AttrRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Attr>)> {
    let Json(payload) = payload?;
    let attr = services::create_attr(state, kind, user_id, payload.name.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(attr)))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<AttrListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Attr>>> {
    list_attrs(&state, AttrKind::Tag, user.id, query).await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<AttrRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Attr>)> {
    create_attr(&state, AttrKind::Tag, user.id, payload).await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<AttrListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Attr>>> {
    list_attrs(&state, AttrKind::Ingredient, user.id, query).await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<AttrRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Attr>)> {
    create_attr(&state, AttrKind::Ingredient, user.id, payload).await
}

// --- recipes ---

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<RecipeListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<RecipeView>>> {
    let Query(query) = query?;
    let filter = RecipeFilter::from_query(&query)?;
    let recipes = services::list_recipes(&state, user.id, &filter).await?;
    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(services::render(&state, RecipeAction::List, recipe).await?);
    }
    Ok(Json(views))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecipeView>)> {
    let Json(payload) = payload?;
    let recipe = services::create_recipe(&state, user.id, payload).await?;
    let view = services::render(&state, RecipeAction::Create, recipe).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<RecipeView>> {
    let id = recipe_id(path)?;
    let recipe = services::get_recipe(&state, user.id, id).await?;
    Ok(Json(
        services::render(&state, RecipeAction::Retrieve, recipe).await?,
    ))
}

async fn update_recipe(
    state: &AppState,
    user_id: i64,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
    partial: bool,
) -> ApiResult<Json<RecipeView>> {
    let id = recipe_id(path)?;
    let Json(payload) = payload?;
    let recipe = services::update_recipe(state, user_id, id, payload, partial).await?;
    Ok(Json(
        services::render(state, RecipeAction::Update, recipe).await?,
    ))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<Json<RecipeView>> {
    update_recipe(&state, user.id, path, payload, true).await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn put_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> ApiResult<Json<RecipeView>> {
    update_recipe(&state, user.id, path, payload, false).await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = recipe_id(path)?;
    services::delete_recipe(&state, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipe/recipes/:id/upload-image (multipart, field `image`)
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<RecipeView>> {
    let id = recipe_id(path)?;
    // foreign recipes are 404 whatever the body looks like
    services::get_recipe(&state, user.id, id).await?;

    let mut mp = mp.map_err(|e| {
        warn!(user_id = user.id, recipe_id = id, error = %e.body_text(), "upload is not multipart");
        ApiError::field("image", "No file was submitted.")
    })?;

    let mut image = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::field("image", e.body_text()))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::field("image", e.body_text()))?;
            image = Some(data);
        }
    }

    let recipe = services::attach_image(&state, user.id, id, image).await?;
    Ok(Json(
        services::render(&state, RecipeAction::UploadImage, recipe).await?,
    ))
}

/// 302 to a (presigned) URL of the recipe image.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_recipe_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = recipe_id(path)?;
    let url = services::recipe_image_url(&state, user.id, id).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}
