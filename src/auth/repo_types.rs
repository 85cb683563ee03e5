use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String, // domain part lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: OffsetDateTime,
}

/// Opaque API token; at most one per user.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
}

/// Privilege flags applied when an account is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Role {
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Role {
    pub const REGULAR: Role = Role {
        is_staff: false,
        is_superuser: false,
    };
    pub const SUPERUSER: Role = Role {
        is_staff: true,
        is_superuser: true,
    };
}
