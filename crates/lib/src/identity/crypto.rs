//! Password hashing for the in-memory identity store
//!
//! Passwords are hashed with Argon2id and stored in PHC string format, which embeds
//! the salt and parameters, so only the hash string needs to be persisted.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};

use super::errors::IdentityError;
use crate::Result;

/// Hash a password using Argon2id, returning the PHC-format hash string.
pub fn hash_password(password: impl AsRef<str>) -> Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_ref().as_bytes(), &salt)
        .map_err(|e| IdentityError::HashingFailed {
            reason: e.to_string(),
        })?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against its stored hash.
///
/// Any mismatch, including an unparsable stored hash, is reported as
/// [`IdentityError::InvalidCredentials`] so callers cannot distinguish the cases.
pub fn verify_password(password: impl AsRef<str>, password_hash: impl AsRef<str>) -> Result<()> {
    let parsed_hash =
        PasswordHash::new(password_hash.as_ref()).map_err(|_| IdentityError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_ref().as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredentials.into())
}
