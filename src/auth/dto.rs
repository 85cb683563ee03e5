use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;
use crate::auth::services::ProfileUpdate;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Request body for token issuance.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request body for `PATCH`/`PUT /user/me`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl From<UpdateUserRequest> for ProfileUpdate {
    fn from(r: UpdateUserRequest) -> Self {
        Self {
            email: r.email,
            password: r.password,
            name: r.name,
        }
    }
}

/// Public part of the user returned to the client. The password is write-only.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            name: u.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn user_response_never_carries_the_password() {
        let user = User {
            id: 1,
            email: "test@gmail.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            name: "Test name".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: OffsetDateTime::now_utc(),
        };

        let raw = serde_json::to_value(&user).unwrap();
        assert!(raw.get("password_hash").is_none());

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "email": "test@gmail.com", "name": "Test name" })
        );
    }

    #[test]
    fn create_request_tolerates_missing_fields() {
        let req: CreateUserRequest = serde_json::from_str(r#"{"password":"pw"}"#).unwrap();
        assert!(req.email.is_none());
        assert!(req.name.is_none());
    }
}
