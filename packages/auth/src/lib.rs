#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Identity and authorization.
//!
//! Passwords are stored as bcrypt hashes, sessions are stateless HS256
//! tokens carrying `{id, username, role}`, and every incident operation is
//! gated by a fixed role matrix ([`Operation::allowed_roles`]).

pub mod password;
pub mod roles;
pub mod service;
pub mod token;

pub use roles::{Operation, authorize};
pub use service::{AuthService, MIN_PASSWORD_LEN};
pub use token::{Claims, TokenService};

use flood_watch_database::DbError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Username or password was empty.
    #[error("Username and password are required")]
    MissingCredentials,

    /// Password is shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Required minimum length.
        min: usize,
    },

    /// Registration with a username that is already taken.
    #[error("Username already exists")]
    UsernameTaken,

    /// Unknown username or wrong password. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No bearer token on a protected request.
    #[error("No token provided")]
    MissingToken,

    /// The token is malformed, expired, or signed with another key.
    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Authenticated, but the role may not perform the operation.
    #[error("Insufficient permissions")]
    Forbidden,

    /// Token signing failed.
    #[error("Failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    /// bcrypt failed (e.g., invalid cost).
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// The blocking hash task panicked or was cancelled.
    #[error("Password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Database error.
    #[error(transparent)]
    Database(#[from] DbError),
}
