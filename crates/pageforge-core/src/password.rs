//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$...`), which embed the
//! salt and parameters, so verification needs nothing but the stored string.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::PasswordError;

/// Hash a password using Argon2id with a fresh random salt.
///
/// # Errors
///
/// Returns [`PasswordError::Hash`] if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash {
            reason: e.to_string(),
        })
}

/// Verify a password against a stored PHC hash.
///
/// An unparseable hash verifies as `false` rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
