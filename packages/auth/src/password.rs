//! bcrypt hashing, run on the blocking pool so slow hashes never stall the
//! async workers.

use crate::AuthError;

pub use bcrypt::{MAX_COST, MIN_COST};

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = 10;

/// Hashes `password` with a fresh salt.
///
/// # Errors
///
/// Returns [`AuthError::Hash`] if `cost` is out of range.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Checks `password` against a stored `hash`.
///
/// A hash that cannot be parsed counts as a mismatch.
///
/// # Errors
///
/// Returns [`AuthError::Join`] if the blocking task fails.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;

    Ok(verified.unwrap_or_else(|e| {
        log::warn!("Stored password hash is unreadable: {e}");
        false
    }))
}
