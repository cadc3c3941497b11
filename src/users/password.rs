//! Argon2 PHC strings for the `users.password` column.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::{StoreError, StoreResult};

fn hash_error(stage: &'static str) -> impl FnOnce(password_hash::Error) -> StoreError {
    move |e| {
        error!(error = %e, stage, "password hashing failed");
        StoreError::PasswordHash(e.to_string())
    }
}

pub fn hash_password(plain: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(hash_error("hash"))?;
    Ok(phc.to_string())
}

/// `Ok(false)` only for a wrong password. A stored value that is not a
/// readable PHC string is an error, not a mismatch.
pub fn verify_password(plain: &str, stored: &str) -> StoreResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(hash_error("parse"))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(hash_error("verify")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_value_is_an_argon2_phc_string() {
        let stored = hash_password("lovelace").expect("hashing should succeed");
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("lovelace"));
        assert!(verify_password("lovelace", &stored).expect("verify should succeed"));
    }

    #[test]
    fn wrong_password_is_a_mismatch_not_an_error() {
        let stored = hash_password("lovelace").unwrap();
        assert!(!verify_password("babbage", &stored).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("repeat-me").unwrap();
        let b = hash_password("repeat-me").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn plaintext_left_in_the_column_is_an_error() {
        let err = verify_password("lovelace", "lovelace").unwrap_err();
        assert!(matches!(err, StoreError::PasswordHash(_)));
    }
}
