//! Password hashing and verification using Argon2id.
//!
//! Parameters are pinned rather than taken from `Argon2::default()` so the work
//! factor of stored hashes does not drift with the crate version.

use crate::core::error::WardenError;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Memory cost in KiB.
pub const MEMORY_COST_KIB: u32 = 19_456;
/// Number of passes.
pub const TIME_COST: u32 = 2;
pub const PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, WardenError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| WardenError::Credential(format!("Invalid hashing parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with a fresh random salt.
///
/// Returns the PHC-formatted string (algorithm, parameters, salt and digest).
pub fn hash_password(password: &str) -> Result<String, WardenError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WardenError::Credential(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, WardenError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| WardenError::Credential(format!("Invalid password hash format: {e}")))?;
    Ok(hasher()?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Accept `hash` only if it is an Argon2id PHC string. Anything else written to
/// the credential column could be a plaintext secret.
pub fn ensure_password_hash(hash: &str) -> Result<(), WardenError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| WardenError::Validation("hashed_password is not a PHC string".to_string()))?;
    if parsed.algorithm != Algorithm::Argon2id.ident() || parsed.hash.is_none() {
        return Err(WardenError::Validation(format!(
            "hashed_password must be an argon2id hash, got '{}'",
            parsed.algorithm
        )));
    }
    Ok(())
}
