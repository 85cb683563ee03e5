use anyhow::Context;
use sqlx::PgPool;

use crate::auth::repo_types::{AuthToken, Role, User};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, is_active, is_staff, is_superuser, created_at";

/// Fields a profile update may change; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileChanges<'a> {
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
}

impl User {
    /// Find a user by (already normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Every account, oldest first.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(db)
        .await
        .context("list users")?;
        Ok(users)
    }

    /// Create a new user with an already hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
        role: Role,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role.is_staff)
        .bind(role.is_superuser)
        .fetch_one(db)
        .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        changes: ProfileChanges<'_>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   name = COALESCE($3, name),
                   password_hash = COALESCE($4, password_hash)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .fetch_one(db)
        .await
    }
}

impl AuthToken {
    /// Store `candidate_key` for the user unless a token already exists, and
    /// return whichever key is now on record.
    pub async fn get_or_create(
        db: &PgPool,
        user_id: i64,
        candidate_key: &str,
    ) -> anyhow::Result<AuthToken> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING key, user_id, created_at
            "#,
        )
        .bind(candidate_key)
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("get or create auth token")?;
        Ok(token)
    }

    /// Resolve the user owning `key`.
    pub async fn find_user(db: &PgPool, key: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.name, u.is_active,
                   u.is_staff, u.is_superuser, u.created_at
              FROM auth_tokens t
              JOIN users u ON u.id = t.user_id
             WHERE t.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(db)
        .await
        .context("find user by token")?;
        Ok(user)
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
