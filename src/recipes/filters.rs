use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

use super::repo_types::AttrKind;

/// Query string of `GET /recipe/recipes`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// Query string of the tag and ingredient lists.
#[derive(Debug, Default, Deserialize)]
pub struct AttrListQuery {
    pub assigned_only: Option<String>,
}

/// Parsed recipe narrowing. `None` means the filter is off.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

impl RecipeFilter {
    pub fn from_query(query: &RecipeListQuery) -> ApiResult<Self> {
        Ok(Self {
            tags: parse_id_list(AttrKind::Tag.field(), query.tags.as_deref())?,
            ingredients: parse_id_list(
                AttrKind::Ingredient.field(),
                query.ingredients.as_deref(),
            )?,
        })
    }
}

/// Parses `"1,2,3"` into ids. An absent or empty value disables the filter;
/// any token that is not an integer is a client error.
pub fn parse_id_list(field: &str, raw: Option<&str>) -> ApiResult<Option<Vec<i64>>> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(None);
    };

    let mut ids = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        let id = token.parse::<i64>().map_err(|_| {
            ApiError::field(
                field,
                format!("\"{token}\" is not a valid id; expected a comma-separated list of integers."),
            )
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(Some(ids))
}

/// `assigned_only` is an integer flag: absent or `0` lists everything.
pub fn parse_assigned_only(raw: Option<&str>) -> ApiResult<bool> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(false),
        Some(value) => value
            .parse::<i64>()
            .map(|v| v != 0)
            .map_err(|_| ApiError::field("assigned_only", "A valid integer is required.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        assert_eq!(parse_id_list("tags", Some("1,2,3")).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list("tags", Some(" 4 , 5 ")).unwrap(), Some(vec![4, 5]));
        assert_eq!(parse_id_list("tags", Some("7,7,8")).unwrap(), Some(vec![7, 8]));
    }

    #[test]
    fn absent_or_empty_list_disables_the_filter() {
        assert_eq!(parse_id_list("tags", None).unwrap(), None);
        assert_eq!(parse_id_list("tags", Some("")).unwrap(), None);
        assert_eq!(parse_id_list("tags", Some("  ")).unwrap(), None);
    }

    #[test]
    fn non_integer_ids_are_a_field_error() {
        for raw in ["a", "1,b", "1,,2", "1.5", "1,"] {
            let err = parse_id_list("ingredients", Some(raw)).unwrap_err();
            let ApiError::Validation(errors) = err else {
                panic!("expected validation error for {raw:?}");
            };
            assert!(errors.get("ingredients").is_some(), "{raw:?}");
        }
    }

    #[test]
    fn filter_from_query() {
        let query = RecipeListQuery {
            tags: Some("1,2".into()),
            ingredients: None,
        };
        let filter = RecipeFilter::from_query(&query).unwrap();
        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, None);

        let query = RecipeListQuery {
            tags: None,
            ingredients: Some("x".into()),
        };
        assert!(RecipeFilter::from_query(&query).is_err());
    }

    #[test]
    fn assigned_only_flag() {
        assert!(!parse_assigned_only(None).unwrap());
        assert!(!parse_assigned_only(Some("")).unwrap());
        assert!(!parse_assigned_only(Some("0")).unwrap());
        assert!(parse_assigned_only(Some("1")).unwrap());
        assert!(parse_assigned_only(Some("2")).unwrap());
        assert!(parse_assigned_only(Some("yes")).is_err());
    }
}
