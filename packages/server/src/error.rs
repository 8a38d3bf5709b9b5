//! HTTP error mapping.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use flood_watch_auth::AuthError;
use flood_watch_database::DbError;
use flood_watch_incident::ServiceError;
use flood_watch_server_models::ErrorResponse;

const INTERNAL_ERROR: &str = "Internal Server Error";

/// An error that becomes a JSON response.
///
/// Internal errors are logged where they are converted; the client only
/// sees the public message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Logs `err` and returns a 500 carrying only `public_message`.
    pub fn internal(public_message: &str, err: &dyn std::fmt::Display) -> Self {
        log::error!("{public_message}: {err}");
        Self::Internal(public_message.to_string())
    }

    /// A single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), message.into());
        Self::Validation(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Validation(errors) => {
                ErrorResponse::new(self.to_string()).with_errors(errors.clone())
            }
            _ => ErrorResponse::new(self.to_string()),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::internal(INTERNAL_ERROR, &e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredentials
            | AuthError::PasswordTooShort { .. }
            | AuthError::UsernameTaken => Self::BadRequest(e.to_string()),
            AuthError::InvalidCredentials | AuthError::MissingToken => {
                Self::Unauthorized(e.to_string())
            }
            AuthError::InvalidToken(ref source) => {
                log::debug!("Token verification failed: {source}");
                Self::Unauthorized(e.to_string())
            }
            AuthError::Forbidden => Self::Forbidden(e.to_string()),
            AuthError::Sign(_) | AuthError::Hash(_) | AuthError::Join(_) | AuthError::Database(_) => {
                Self::internal(INTERNAL_ERROR, &e)
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(errors) => Self::Validation(errors),
            ServiceError::BadRequest(message) => Self::BadRequest(message),
            ServiceError::Forbidden(message) => Self::Forbidden(message),
            ServiceError::NotFound(message) => Self::NotFound(message),
            ServiceError::Database(db) => db.into(),
        }
    }
}
