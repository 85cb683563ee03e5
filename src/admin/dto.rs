use serde::Serialize;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

/// Account as shown to staff: flags included, password hash never.
#[derive(Debug, Serialize)]
pub struct AdminUserView {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for AdminUserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            is_active: u.is_active,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn view_carries_flags_but_not_the_hash() {
        let user = User {
            id: 7,
            email: "admin@gmail.com".into(),
            password_hash: "$argon2id$secret".into(),
            name: "Admin".into(),
            is_active: true,
            is_staff: true,
            is_superuser: true,
            created_at: datetime!(2024-01-02 03:04:05 UTC),
        };
        let json = serde_json::to_value(AdminUserView::from(user)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["is_staff"], true);
        assert_eq!(json["is_superuser"], true);
        assert_eq!(json["created_at"], "2024-01-02T03:04:05Z");
        assert!(!json.to_string().contains("argon2"));
    }
}
