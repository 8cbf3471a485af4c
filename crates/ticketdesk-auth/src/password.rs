//! Argon2id password hashing for stored user credentials

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Hashing a new password failed
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Verification could not be carried out (not a mismatch)
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// The stored hash is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a plain text password into a PHC string suitable for the `users` table.
///
/// Uses Argon2id with the crate defaults (19 MiB, 2 iterations, 1 lane) and a
/// fresh random salt, so hashing the same password twice yields different
/// strings.
///
/// # Example
/// ```
/// use ticketdesk_auth::password::hash_password;
///
/// let hash = hash_password("correct horse battery").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Check a plain text password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed hash or an internal failure is
/// an error, so callers can treat "wrong password" and "unknown user" the same
/// way without inspecting error kinds.
///
/// # Example
/// ```
/// use ticketdesk_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("s3cret-passphrase").unwrap();
/// assert!(verify_password("s3cret-passphrase", &hash).unwrap());
/// assert!(!verify_password("guess", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}
