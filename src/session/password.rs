//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;
use tracing::error;

use crate::shared::AppError;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        error!(error = %err, "Password primitive failed");
        AppError::Internal
    }
}

/// Hashes a password into a PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("squat-rack-42").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("squat-rack-42", &hash).unwrap());
        assert!(!verify_password("Squat-rack-42", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let first = hash_password("deadlift").unwrap();
        let second = hash_password("deadlift").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("anything", "plaintext-not-a-hash");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat(_))));
    }
}
