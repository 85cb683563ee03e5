use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";
pub const FIELD_REQUIRED: &str = "This field is required.";
pub const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Validation messages keyed by the offending field name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected, otherwise the matching `ApiError`.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("invalid credentials")]
    Credentials,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Credentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            other => ApiError::Internal(other.into()),
        }
    }
}

/// Splits `"time_minutes: invalid type ..."` into the top-level field and
/// the message. Errors without a field path yield `None`.
fn split_field_path(detail: &str) -> Option<(&str, &str)> {
    let (path, message) = detail.split_once(": ")?;
    let valid = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    if !valid {
        return None;
    }
    let field = path.split(['.', '[']).next().filter(|f| !f.is_empty())?;
    Some((field, message))
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        if let JsonRejection::JsonDataError(_) = rejection {
            if let Some((field, message)) = text
                .strip_prefix(JSON_DATA_PREFIX)
                .and_then(split_field_path)
            {
                return ApiError::field(field, message);
            }
        }
        ApiError::field(NON_FIELD_ERRORS, text)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        let text = rejection.body_text();
        // serde_urlencoded names the field only for duplicates
        let duplicate = text
            .split_once("duplicate field `")
            .and_then(|(_, rest)| rest.split_once('`'))
            .map(|(field, _)| field.to_string());
        match duplicate {
            Some(field) => ApiError::field(&field, "Pass this parameter at most once."),
            None => ApiError::field(NON_FIELD_ERRORS, text),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::Credentials => json!({ NON_FIELD_ERRORS: [INVALID_CREDENTIALS] }),
            ApiError::Unauthenticated(detail) => json!({ "detail": detail }),
            ApiError::Forbidden => json!({ "detail": PERMISSION_DENIED }),
            ApiError::NotFound => json!({ "detail": "Not found." }),
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                json!({ "detail": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn validation_errors_are_keyed_by_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", FIELD_REQUIRED);
        errors.add("password", "too short");
        errors.add("password", "too common");

        let res = ApiError::Validation(errors).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["email"], json!([FIELD_REQUIRED]));
        assert_eq!(body["password"], json!(["too short", "too common"]));
    }

    #[tokio::test]
    async fn credentials_error_does_not_say_which_factor_failed() {
        let res = ApiError::Credentials.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body, json!({ "non_field_errors": [INVALID_CREDENTIALS] }));
    }

    #[tokio::test]
    async fn status_codes_follow_the_error_kind() {
        assert_eq!(
            ApiError::Unauthenticated("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );

        let res = ApiError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert!(!body.to_string().contains("exploded"));
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(matches!(
            FieldErrors::single("name", FIELD_REQUIRED).into_result(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn field_path_is_taken_from_deserialize_errors() {
        assert_eq!(
            split_field_path("time_minutes: invalid type: string \"abc\", expected i32"),
            Some(("time_minutes", "invalid type: string \"abc\", expected i32"))
        );
        assert_eq!(
            split_field_path("tags[1]: invalid type: string \"x\", expected i64"),
            Some(("tags", "invalid type: string \"x\", expected i64"))
        );
        assert_eq!(split_field_path("invalid type: map, expected a string"), None);
        assert_eq!(split_field_path("missing field `name`"), None);
    }
}
