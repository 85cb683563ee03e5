use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::{
    auth::repo_types::{AuthToken, User},
    error::ApiError,
    state::AppState,
};

/// The user behind a valid `Authorization: Token <key>` header.
pub struct AuthUser(pub User);

/// Extracts the key from a `Token <key>` header value.
pub fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    if !scheme.eq_ignore_ascii_case("token") || key.is_empty() || key.contains(char::is_whitespace)
    {
        return None;
    }
    Some(key)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| {
                ApiError::Unauthenticated("Authentication credentials were not provided.".into())
            })?;

        let key = header
            .to_str()
            .ok()
            .and_then(token_from_header)
            .ok_or_else(|| ApiError::Unauthenticated("Invalid token header.".into()))?;

        let user = match AuthToken::find_user(&state.db, key).await? {
            Some(user) => user,
            None => {
                warn!("unknown token");
                return Err(ApiError::Unauthenticated("Invalid token.".into()));
            }
        };

        if !user.is_active {
            warn!(user_id = user.id, "token of inactive user");
            return Err(ApiError::Unauthenticated("User inactive or deleted.".into()));
        }

        Ok(AuthUser(user))
    }
}

/// An authenticated user with the staff flag set.
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            warn!(user_id = user.id, "non-staff user on admin endpoint");
            return Err(ApiError::Forbidden);
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_scheme() {
        assert_eq!(token_from_header("Token abc123"), Some("abc123"));
        assert_eq!(token_from_header("token abc123"), Some("abc123"));
        assert_eq!(token_from_header("  Token   abc123 "), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes_and_malformed_values() {
        assert_eq!(token_from_header("Bearer abc123"), None);
        assert_eq!(token_from_header("Token"), None);
        assert_eq!(token_from_header("Token "), None);
        assert_eq!(token_from_header("Token abc 123"), None);
        assert_eq!(token_from_header("abc123"), None);
    }
}
