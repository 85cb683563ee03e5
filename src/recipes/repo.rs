use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::filters::RecipeFilter;
use super::repo_types::{Attr, AttrKind, Recipe};

const RECIPE_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.title, r.time_minutes, r.price, r.link, r.image, r.created_at,
           ARRAY(SELECT rt.tag_id FROM recipe_tags rt
                  WHERE rt.recipe_id = r.id ORDER BY rt.tag_id) AS tag_ids,
           ARRAY(SELECT ri.ingredient_id FROM recipe_ingredients ri
                  WHERE ri.recipe_id = r.id ORDER BY ri.ingredient_id) AS ingredient_ids
      FROM recipes r
"#;

/// Scalar recipe columns as written by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFields {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
}

// ---- Tags and ingredients ----

/// Owner's tags or ingredients, name descending. With `assigned_only`, only
/// those linked to at least one recipe, each listed once.
pub async fn list_attrs(
    db: &PgPool,
    kind: AttrKind,
    user_id: i64,
    assigned_only: bool,
) -> anyhow::Result<Vec<Attr>> {
    let sql = format!(
        r#"
        SELECT a.id, a.name
          FROM {table} a
         WHERE a.user_id = $1
           AND (NOT $2 OR EXISTS (
                SELECT 1 FROM {link} l WHERE l.{column} = a.id))
         ORDER BY a.name DESC, a.id DESC
        "#,
        table = kind.table(),
        link = kind.link_table(),
        column = kind.link_column(),
    );
    let rows = sqlx::query_as::<_, Attr>(&sql)
        .bind(user_id)
        .bind(assigned_only)
        .fetch_all(db)
        .await
        .with_context(|| format!("list {}", kind.table()))?;
    Ok(rows)
}

pub async fn insert_attr(
    db: &PgPool,
    kind: AttrKind,
    user_id: i64,
    name: &str,
) -> anyhow::Result<Attr> {
    let sql = format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, name",
        kind.table()
    );
    let row = sqlx::query_as::<_, Attr>(&sql)
        .bind(user_id)
        .bind(name)
        .fetch_one(db)
        .await
        .with_context(|| format!("insert into {}", kind.table()))?;
    Ok(row)
}

/// Which of `ids` exist and belong to `user_id`.
pub async fn owned_attr_ids(
    db: &PgPool,
    kind: AttrKind,
    user_id: i64,
    ids: &[i64],
) -> anyhow::Result<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT id FROM {} WHERE user_id = $1 AND id = ANY($2)",
        kind.table()
    );
    let rows: Vec<(i64,)> = sqlx::query_as(&sql)
        .bind(user_id)
        .bind(ids)
        .fetch_all(db)
        .await
        .with_context(|| format!("check {} ownership", kind.table()))?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Tags or ingredients linked to a recipe, id ascending.
pub async fn list_recipe_attrs(
    db: &PgPool,
    kind: AttrKind,
    recipe_id: i64,
) -> anyhow::Result<Vec<Attr>> {
    let sql = format!(
        r#"
        SELECT a.id, a.name
          FROM {table} a
          JOIN {link} l ON l.{column} = a.id
         WHERE l.recipe_id = $1
         ORDER BY a.id
        "#,
        table = kind.table(),
        link = kind.link_table(),
        column = kind.link_column(),
    );
    let rows = sqlx::query_as::<_, Attr>(&sql)
        .bind(recipe_id)
        .fetch_all(db)
        .await
        .with_context(|| format!("list {} of recipe", kind.table()))?;
    Ok(rows)
}

// ---- Recipes ----

/// Owner's recipes, id ascending, narrowed by the tag/ingredient filter.
/// Each filter is an OR over its ids; both filters must hold when present.
pub async fn list_recipes(
    db: &PgPool,
    user_id: i64,
    filter: &RecipeFilter,
) -> anyhow::Result<Vec<Recipe>> {
    let sql = format!(
        r#"
        {RECIPE_SELECT}
         WHERE r.user_id = $1
           AND ($2::BIGINT[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                 WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
           AND ($3::BIGINT[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_ingredients ri
                 WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
         ORDER BY r.id
        "#
    );
    let rows = sqlx::query_as::<_, Recipe>(&sql)
        .bind(user_id)
        .bind(filter.tags.as_deref())
        .bind(filter.ingredients.as_deref())
        .fetch_all(db)
        .await
        .context("list recipes")?;
    Ok(rows)
}

/// A recipe owned by `user_id`; `None` covers both absent and foreign rows.
pub async fn find_recipe(db: &PgPool, user_id: i64, id: i64) -> anyhow::Result<Option<Recipe>> {
    let sql = format!("{RECIPE_SELECT} WHERE r.id = $1 AND r.user_id = $2");
    let row = sqlx::query_as::<_, Recipe>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find recipe")?;
    Ok(row)
}

pub async fn insert_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    fields: &RecipeFields,
) -> anyhow::Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO recipes (user_id, title, time_minutes, price, link)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&fields.title)
    .bind(fields.time_minutes)
    .bind(fields.price)
    .bind(&fields.link)
    .fetch_one(&mut **tx)
    .await
    .context("insert recipe")?;
    Ok(id)
}

/// Updates whichever scalar columns are `Some`.
pub async fn update_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    title: Option<&str>,
    time_minutes: Option<i32>,
    price: Option<Decimal>,
    link: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE recipes
           SET title = COALESCE($2, title),
               time_minutes = COALESCE($3, time_minutes),
               price = COALESCE($4, price),
               link = COALESCE($5, link)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .bind(link)
    .execute(&mut **tx)
    .await
    .context("update recipe")?;
    Ok(())
}

/// Replace the recipe's links of `kind` with `ids`.
pub async fn set_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: AttrKind,
    recipe_id: i64,
    ids: &[i64],
) -> anyhow::Result<()> {
    let delete = format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table());
    sqlx::query(&delete)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("clear {}", kind.link_table()))?;

    if ids.is_empty() {
        return Ok(());
    }
    let insert = format!(
        r#"
        INSERT INTO {link} (recipe_id, {column})
        SELECT $1, UNNEST($2::BIGINT[])
        ON CONFLICT DO NOTHING
        "#,
        link = kind.link_table(),
        column = kind.link_column(),
    );
    sqlx::query(&insert)
        .bind(recipe_id)
        .bind(ids)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("fill {}", kind.link_table()))?;
    Ok(())
}

pub async fn set_image(db: &PgPool, user_id: i64, id: i64, key: &str) -> anyhow::Result<bool> {
    let res = sqlx::query("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .bind(key)
        .execute(db)
        .await
        .context("set recipe image")?;
    Ok(res.rows_affected() == 1)
}

/// Deletes the recipe and returns its image key, or `None` if nothing matched.
pub async fn delete_recipe(
    db: &PgPool,
    user_id: i64,
    id: i64,
) -> anyhow::Result<Option<Option<String>>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING image")
            .bind(id)
            .bind(user_id)
            .fetch_optional(db)
            .await
            .context("delete recipe")?;
    Ok(row.map(|(image,)| image))
}
