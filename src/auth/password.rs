use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Spend one verification on a throwaway hash, so a login for an unknown
/// user takes as long as one with a wrong password.
pub fn burn_verification(password: &str) {
    static DUMMY: OnceLock<String> = OnceLock::new();
    let dummy = DUMMY.get_or_init(|| hash_password("unused-account").unwrap_or_default());
    let _ = verify_password(password, dummy);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Minera1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Minera1", &hash));
        assert!(!verify_password("minera1", &hash));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("ANDRES").unwrap();
        let b = hash_password("ANDRES").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn foreign_hash_format_is_rejected() {
        assert!(!verify_password("x", "pbkdf2:sha256:260000$abc$def"));
        assert!(!verify_password("x", ""));
    }
}
