use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2id PHC string for `plain`, salted with fresh randomness.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_is_not_the_sign_up_password() {
        let hash = hash_password("DataScience2021").unwrap();
        assert_ne!(hash, "DataScience2021");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("DataScience2021", &hash).unwrap());
    }

    #[test]
    fn two_accounts_with_one_password_get_distinct_hashes() {
        assert_ne!(hash_password("testpass").unwrap(), hash_password("testpass").unwrap());
    }

    #[test]
    fn login_with_the_old_password_fails_after_a_change() {
        let old = hash_password("testpass").unwrap();
        let new = hash_password("newpassword").unwrap();
        assert!(!verify_password("testpass", &new).unwrap());
        assert!(verify_password("testpass", &old).unwrap());
    }

    #[test]
    fn corrupted_stored_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("testpass", "plaintext-leaked-into-db").is_err());
    }
}
