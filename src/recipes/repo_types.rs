use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// The two user-owned label records a recipe can link to. They share one
/// table layout and one set of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Tag,
    Ingredient,
}

impl AttrKind {
    pub fn table(self) -> &'static str {
        match self {
            AttrKind::Tag => "tags",
            AttrKind::Ingredient => "ingredients",
        }
    }

    /// Join table linking recipes to this kind.
    pub fn link_table(self) -> &'static str {
        match self {
            AttrKind::Tag => "recipe_tags",
            AttrKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            AttrKind::Tag => "tag_id",
            AttrKind::Ingredient => "ingredient_id",
        }
    }

    /// Field name used for this kind in recipe payloads and query strings.
    pub fn field(self) -> &'static str {
        self.table()
    }
}

/// A tag or ingredient as stored and as serialized: `{id, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Attr {
    pub id: i64,
    pub name: String,
}

/// Recipe row with the ids of its linked tags and ingredients.
#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>, // storage key
    pub created_at: OffsetDateTime,
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}
