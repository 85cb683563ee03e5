use anyhow::Context;
use bytes::Bytes;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult, FieldErrors, FIELD_REQUIRED},
    state::AppState,
};

use super::{
    dto::{RecipeAction, RecipeDetail, RecipeRequest, RecipeView},
    filters::RecipeFilter,
    images,
    repo::{self, RecipeFields},
    repo_types::{Attr, AttrKind, Recipe},
};

pub const MAX_TEXT_LEN: usize = 255;
const PRICE_MAX_DIGITS: u32 = 5;
const PRICE_DECIMAL_PLACES: u32 = 2;

fn check_text(field: &str, value: &str, errors: &mut FieldErrors, allow_blank: bool) {
    if !allow_blank && value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > MAX_TEXT_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_TEXT_LEN} characters."),
        );
    }
}

/// Brings a price to two decimal places, or says why it does not fit.
pub fn normalize_price(price: Decimal) -> Result<Decimal, String> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.".into());
    }
    let price = price.normalize();
    if price.scale() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    let limit = Decimal::from(10i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price >= limit {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ));
    }
    let mut price = price;
    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}

fn dedup(ids: Vec<i64>) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// A validated recipe write. `None` leaves the stored value alone, which
/// only happens for partial updates.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

impl RecipeChanges {
    /// Field-level validation. A full write (`partial == false`) needs
    /// title, time and price; missing link and relations reset to empty.
    pub fn validate(req: RecipeRequest, partial: bool) -> ApiResult<Self> {
        let mut errors = FieldErrors::new();

        match &req.title {
            Some(title) => check_text("title", title, &mut errors, false),
            None if !partial => errors.add("title", FIELD_REQUIRED),
            None => {}
        }
        match req.time_minutes {
            Some(t) if t < 0 => errors.add(
                "time_minutes",
                "Ensure this value is greater than or equal to 0.",
            ),
            None if !partial => errors.add("time_minutes", FIELD_REQUIRED),
            _ => {}
        }
        let price = match req.price.map(normalize_price) {
            Some(Ok(price)) => Some(price),
            Some(Err(msg)) => {
                errors.add("price", msg);
                None
            }
            None => {
                if !partial {
                    errors.add("price", FIELD_REQUIRED);
                }
                None
            }
        };
        if let Some(link) = &req.link {
            check_text("link", link, &mut errors, true);
        }
        errors.into_result()?;

        let (link, tags, ingredients) = if partial {
            (req.link, req.tags, req.ingredients)
        } else {
            (
                Some(req.link.unwrap_or_default()),
                Some(req.tags.unwrap_or_default()),
                Some(req.ingredients.unwrap_or_default()),
            )
        };

        Ok(Self {
            title: req.title.map(|t| t.trim().to_string()),
            time_minutes: req.time_minutes,
            price,
            link: link.map(|l| l.trim().to_string()),
            tags: tags.map(dedup),
            ingredients: ingredients.map(dedup),
        })
    }

    fn links(&self, kind: AttrKind) -> Option<&[i64]> {
        match kind {
            AttrKind::Tag => self.tags.as_deref(),
            AttrKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

/// Every referenced tag/ingredient must exist and belong to the requester.
async fn ensure_owned(st: &AppState, user_id: i64, changes: &RecipeChanges) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    for kind in [AttrKind::Tag, AttrKind::Ingredient] {
        let Some(ids) = changes.links(kind) else {
            continue;
        };
        let owned = repo::owned_attr_ids(&st.db, kind, user_id, ids).await?;
        if let Some(missing) = ids.iter().find(|id| !owned.contains(id)) {
            errors.add(
                kind.field(),
                format!("Invalid pk \"{missing}\" - object does not exist."),
            );
        }
    }
    errors.into_result()
}

// ---- Tags and ingredients ----

pub async fn list_attrs(
    st: &AppState,
    kind: AttrKind,
    user_id: i64,
    assigned_only: bool,
) -> ApiResult<Vec<Attr>> {
    Ok(repo::list_attrs(&st.db, kind, user_id, assigned_only).await?)
}

pub async fn create_attr(
    st: &AppState,
    kind: AttrKind,
    user_id: i64,
    name: Option<&str>,
) -> ApiResult<Attr> {
    let mut errors = FieldErrors::new();
    match name {
        Some(name) => check_text("name", name, &mut errors, false),
        None => errors.add("name", FIELD_REQUIRED),
    }
    errors.into_result()?;

    let name = name.unwrap_or_default().trim();
    let attr = repo::insert_attr(&st.db, kind, user_id, name).await?;
    info!(user_id, id = attr.id, kind = kind.table(), "attr created");
    Ok(attr)
}

// ---- Recipes ----

pub async fn list_recipes(
    st: &AppState,
    user_id: i64,
    filter: &RecipeFilter,
) -> ApiResult<Vec<Recipe>> {
    Ok(repo::list_recipes(&st.db, user_id, filter).await?)
}

pub async fn get_recipe(st: &AppState, user_id: i64, id: i64) -> ApiResult<Recipe> {
    repo::find_recipe(&st.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn create_recipe(st: &AppState, user_id: i64, req: RecipeRequest) -> ApiResult<Recipe> {
    let changes = RecipeChanges::validate(req, false)?;
    ensure_owned(st, user_id, &changes).await?;

    let (Some(title), Some(time_minutes), Some(price)) =
        (changes.title.clone(), changes.time_minutes, changes.price)
    else {
        return Err(anyhow::anyhow!("create_recipe called with a partial payload").into());
    };
    let fields = RecipeFields {
        title,
        time_minutes,
        price,
        link: changes.link.clone().unwrap_or_default(),
    };

    let mut tx = st.db.begin().await.context("begin tx")?;
    let id = repo::insert_recipe_tx(&mut tx, user_id, &fields).await?;
    for kind in [AttrKind::Tag, AttrKind::Ingredient] {
        if let Some(ids) = changes.links(kind) {
            repo::set_links_tx(&mut tx, kind, id, ids).await?;
        }
    }
    tx.commit().await.context("commit tx")?;

    info!(user_id, recipe_id = id, "recipe created");
    get_recipe(st, user_id, id).await
}

pub async fn update_recipe(
    st: &AppState,
    user_id: i64,
    id: i64,
    req: RecipeRequest,
    partial: bool,
) -> ApiResult<Recipe> {
    // 404 before 400: a foreign recipe must not reveal validation details
    get_recipe(st, user_id, id).await?;
    let changes = RecipeChanges::validate(req, partial)?;
    ensure_owned(st, user_id, &changes).await?;

    let mut tx = st.db.begin().await.context("begin tx")?;
    repo::update_recipe_tx(
        &mut tx,
        id,
        changes.title.as_deref(),
        changes.time_minutes,
        changes.price,
        changes.link.as_deref(),
    )
    .await?;
    for kind in [AttrKind::Tag, AttrKind::Ingredient] {
        if let Some(ids) = changes.links(kind) {
            repo::set_links_tx(&mut tx, kind, id, ids).await?;
        }
    }
    tx.commit().await.context("commit tx")?;

    info!(user_id, recipe_id = id, "recipe updated");
    get_recipe(st, user_id, id).await
}

pub async fn delete_recipe(st: &AppState, user_id: i64, id: i64) -> ApiResult<()> {
    let image = repo::delete_recipe(&st.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if let Some(key) = image {
        images::discard_image(st, &key).await;
    }
    info!(user_id, recipe_id = id, "recipe deleted");
    Ok(())
}

/// Validates, stores and attaches a new image. The recipe is untouched when
/// the payload is not an image.
pub async fn attach_image(
    st: &AppState,
    user_id: i64,
    id: i64,
    body: Option<Bytes>,
) -> ApiResult<Recipe> {
    let recipe = get_recipe(st, user_id, id).await?;

    let body = match body {
        None => return Err(ApiError::field("image", "No file was submitted.")),
        Some(body) if body.is_empty() => {
            return Err(ApiError::field("image", "The submitted file is empty."))
        }
        Some(body) => body,
    };
    let checked = images::check_image(body).map_err(|msg| {
        warn!(user_id, recipe_id = id, "rejected non-image upload");
        ApiError::field("image", msg)
    })?;

    let key = images::store_image(st, checked).await?;
    match repo::set_image(&st.db, user_id, id, &key).await {
        Ok(true) => {}
        Ok(false) => {
            images::discard_image(st, &key).await;
            return Err(ApiError::NotFound);
        }
        Err(e) => {
            images::discard_image(st, &key).await;
            return Err(e.into());
        }
    }
    if let Some(old) = recipe.image.as_deref().filter(|old| *old != key) {
        images::discard_image(st, old).await;
    }

    info!(user_id, recipe_id = id, key = %key, "recipe image uploaded");
    get_recipe(st, user_id, id).await
}

/// Storage URL of the recipe's image, if it has one.
pub async fn recipe_image_url(st: &AppState, user_id: i64, id: i64) -> ApiResult<String> {
    let recipe = get_recipe(st, user_id, id).await?;
    let key = recipe.image.ok_or(ApiError::NotFound)?;
    Ok(images::image_url(st, &key).await?)
}

/// Picks the representation for `action`; only the detail view loads the
/// related records.
pub async fn render(st: &AppState, action: RecipeAction, recipe: Recipe) -> ApiResult<RecipeView> {
    let view = match action {
        RecipeAction::Retrieve => {
            let tags = repo::list_recipe_attrs(&st.db, AttrKind::Tag, recipe.id).await?;
            let ingredients =
                repo::list_recipe_attrs(&st.db, AttrKind::Ingredient, recipe.id).await?;
            RecipeView::Detail(RecipeDetail::new(recipe, tags, ingredients))
        }
        RecipeAction::UploadImage => RecipeView::Image(recipe.into()),
        RecipeAction::List | RecipeAction::Create | RecipeAction::Update => {
            RecipeView::Summary(recipe.into())
        }
    };
    Ok(view)
}
