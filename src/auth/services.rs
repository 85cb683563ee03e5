use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo::{is_unique_violation, ProfileChanges},
        repo_types::{AuthToken, Role, User},
    },
    error::{ApiError, ApiResult, FieldErrors, FIELD_REQUIRED},
};

pub const MIN_PASSWORD_LEN: usize = 5;
pub const MAX_NAME_LEN: usize = 255;
pub const TOKEN_KEY_LEN: usize = 40;

const EMAIL_TAKEN: &str = "user with this email already exists.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim and lower-case the domain part; the local part is case sensitive.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Normalizes `email` and records why it is unusable, if it is.
fn check_email(raw: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let Some(raw) = raw else {
        errors.add("email", FIELD_REQUIRED);
        return None;
    };
    let email = normalize_email(raw);
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
        return None;
    }
    if !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
        return None;
    }
    Some(email)
}

fn check_password<'a>(raw: Option<&'a str>, errors: &mut FieldErrors) -> Option<&'a str> {
    let Some(password) = raw else {
        errors.add("password", FIELD_REQUIRED);
        return None;
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        );
        return None;
    }
    Some(password)
}

fn check_name(raw: Option<&str>, errors: &mut FieldErrors) {
    if raw.is_some_and(|name| name.chars().count() > MAX_NAME_LEN) {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        );
    }
}

/// Validated input for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl NewAccount {
    pub fn validate(
        email: Option<&str>,
        password: Option<&str>,
        name: Option<&str>,
    ) -> ApiResult<Self> {
        let mut errors = FieldErrors::new();
        let email = check_email(email, &mut errors);
        let password = check_password(password, &mut errors);
        check_name(name, &mut errors);
        errors.into_result()?;

        match (email, password) {
            (Some(email), Some(password)) => Ok(Self {
                email,
                password: password.to_string(),
                name: name.unwrap_or_default().trim().to_string(),
            }),
            _ => Err(ApiError::Internal(anyhow::anyhow!(
                "account validation passed without email or password"
            ))),
        }
    }
}

async fn create_account(db: &PgPool, account: NewAccount, role: Role) -> ApiResult<User> {
    if User::find_by_email(db, &account.email).await?.is_some() {
        warn!(email = %account.email, "email already registered");
        return Err(ApiError::field("email", EMAIL_TAKEN));
    }

    let hash = hash_password(&account.password)?;
    match User::create(db, &account.email, &hash, &account.name, role).await {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, superuser = role.is_superuser, "user created");
            Ok(user)
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::field("email", EMAIL_TAKEN)),
        Err(e) => Err(e.into()),
    }
}

pub async fn create_user(db: &PgPool, account: NewAccount) -> ApiResult<User> {
    create_account(db, account, Role::REGULAR).await
}

pub async fn create_superuser(db: &PgPool, account: NewAccount) -> ApiResult<User> {
    create_account(db, account, Role::SUPERUSER).await
}

pub fn generate_token_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_KEY_LEN)
        .map(char::from)
        .collect()
}

/// Checks the credentials and returns the matching active user. Every
/// failure is reported the same way.
pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> ApiResult<User> {
    let email = normalize_email(email);
    let Some(user) = User::find_by_email(db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Credentials);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Credentials);
    }
    if !user.is_active {
        warn!(user_id = user.id, "login inactive user");
        return Err(ApiError::Credentials);
    }
    Ok(user)
}

/// Returns the user's token, creating it on first successful login.
pub async fn issue_token(
    db: &PgPool,
    email: Option<&str>,
    password: Option<&str>,
) -> ApiResult<String> {
    let mut errors = FieldErrors::new();
    if email.is_none() {
        errors.add("email", FIELD_REQUIRED);
    }
    if password.is_none() {
        errors.add("password", FIELD_REQUIRED);
    }
    errors.into_result()?;

    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::Credentials);
    };
    let user = authenticate(db, email, password).await?;
    let token = AuthToken::get_or_create(db, user.id, &generate_token_key()).await?;
    info!(user_id = user.id, "token issued");
    Ok(token.key)
}

/// Profile fields sent by the client.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Applies a PATCH (`partial`) or PUT to the user's own profile.
pub async fn update_profile(
    db: &PgPool,
    user: &User,
    update: ProfileUpdate,
    partial: bool,
) -> ApiResult<User> {
    let mut errors = FieldErrors::new();

    let email = if partial && update.email.is_none() {
        None
    } else {
        check_email(update.email.as_deref(), &mut errors)
    };
    let password = if partial && update.password.is_none() {
        None
    } else {
        check_password(update.password.as_deref(), &mut errors)
    };
    check_name(update.name.as_deref(), &mut errors);
    errors.into_result()?;

    if let Some(email) = email.as_deref().filter(|e| *e != user.email) {
        if User::find_by_email(db, email).await?.is_some() {
            return Err(ApiError::field("email", EMAIL_TAKEN));
        }
    }

    let password_hash = password.map(hash_password).transpose()?;
    let name = update.name.as_deref().map(str::trim);
    let changes = ProfileChanges {
        email: email.as_deref(),
        name,
        password_hash: password_hash.as_deref(),
    };

    match User::update_profile(db, user.id, changes).await {
        Ok(updated) => {
            info!(user_id = updated.id, "profile updated");
            Ok(updated)
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::field("email", EMAIL_TAKEN)),
        Err(e) => Err(e.into()),
    }
}
