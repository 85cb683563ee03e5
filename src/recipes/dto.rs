use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo_types::{Attr, Recipe};

/// Write side of tags and ingredients; the id is server assigned.
#[derive(Debug, Deserialize)]
pub struct AttrRequest {
    pub name: Option<String>,
}

/// Recipe write payload shared by create, PUT and PATCH.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// List/create/update representation: related records as bare ids.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub ingredients: Vec<i64>,
    pub tags: Vec<i64>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
}

impl From<Recipe> for RecipeSummary {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            ingredients: r.ingredient_ids,
            tags: r.tag_ids,
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
        }
    }
}

/// Detail representation: related records nested as `{id, name}`.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub ingredients: Vec<Attr>,
    pub tags: Vec<Attr>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

impl RecipeDetail {
    pub fn new(r: Recipe, tags: Vec<Attr>, ingredients: Vec<Attr>) -> Self {
        Self {
            id: r.id,
            title: r.title,
            ingredients,
            tags,
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
            image: r.image,
        }
    }
}

/// Image upload representation.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeImage {
    pub id: i64,
    pub image: Option<String>,
}

impl From<Recipe> for RecipeImage {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            image: r.image,
        }
    }
}

/// What a recipe endpoint is doing; decides the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeAction {
    List,
    Create,
    Retrieve,
    Update,
    UploadImage,
}

/// One recipe rendered for a given action.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecipeView {
    Summary(RecipeSummary),
    Detail(RecipeDetail),
    Image(RecipeImage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use time::OffsetDateTime;

    fn recipe() -> Recipe {
        Recipe {
            id: 3,
            user_id: 1,
            title: "Sample recipe".into(),
            time_minutes: 10,
            price: Decimal::from_str("5.00").unwrap(),
            link: String::new(),
            image: Some("uploads/recipe/x.png".into()),
            created_at: OffsetDateTime::now_utc(),
            tag_ids: vec![1, 2],
            ingredient_ids: vec![9],
        }
    }

    #[test]
    fn summary_uses_ids_and_string_price() {
        let json = serde_json::to_value(RecipeView::Summary(recipe().into())).unwrap();
        assert_eq!(
            json,
            json!({
                "id": 3,
                "title": "Sample recipe",
                "ingredients": [9],
                "tags": [1, 2],
                "time_minutes": 10,
                "price": "5.00",
                "link": "",
            })
        );
    }

    #[test]
    fn detail_nests_related_records() {
        let tags = vec![
            Attr { id: 1, name: "Vegan".into() },
            Attr { id: 2, name: "Dessert".into() },
        ];
        let ingredients = vec![Attr { id: 9, name: "Cinnamon".into() }];
        let json =
            serde_json::to_value(RecipeView::Detail(RecipeDetail::new(recipe(), tags, ingredients)))
                .unwrap();
        assert_eq!(json["tags"], json!([{"id": 1, "name": "Vegan"}, {"id": 2, "name": "Dessert"}]));
        assert_eq!(json["ingredients"], json!([{"id": 9, "name": "Cinnamon"}]));
        assert_eq!(json["image"], json!("uploads/recipe/x.png"));
    }

    #[test]
    fn image_view_is_minimal() {
        let json = serde_json::to_value(RecipeView::Image(recipe().into())).unwrap();
        assert_eq!(json, json!({"id": 3, "image": "uploads/recipe/x.png"}));
    }

    #[test]
    fn request_accepts_numeric_or_string_price() {
        let req: RecipeRequest =
            serde_json::from_str(r#"{"title":"t","time_minutes":30,"price":10.5}"#).unwrap();
        assert_eq!(req.price, Some(Decimal::from_str("10.5").unwrap()));
        let req: RecipeRequest = serde_json::from_str(r#"{"price":"4.25"}"#).unwrap();
        assert_eq!(req.price, Some(Decimal::from_str("4.25").unwrap()));
        assert!(req.tags.is_none());
    }
}
