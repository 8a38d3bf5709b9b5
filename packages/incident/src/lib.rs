#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident service.
//!
//! Sits between the HTTP handlers and the incident repository. Every
//! operation takes the caller's verified [`Claims`](flood_watch_auth::Claims),
//! applies the role matrix, validates and parses the loosely typed request
//! bodies, and only then touches the database.

pub mod params;
pub mod service;

use std::collections::BTreeMap;

use flood_watch_auth::AuthError;
use flood_watch_database::DbError;

pub use service::IncidentService;

/// Errors returned by incident operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// One or more request fields are invalid. Maps field name to message.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    /// The request is well-formed but cannot be honored.
    #[error("{0}")]
    BadRequest(String),

    /// The caller's role does not allow this.
    #[error("{0}")]
    Forbidden(String),

    /// The incident or rescue step does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Database error.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Forbidden => Self::Forbidden(AuthError::Forbidden.to_string()),
            AuthError::Database(db) => Self::Database(db),
            other => Self::BadRequest(other.to_string()),
        }
    }
}
