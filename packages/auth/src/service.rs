//! Registration and login.

use std::sync::Arc;

use flood_watch_database::users;
use flood_watch_user_models::{Role, User};
use switchy_database::Database;

use crate::{
    AuthError, TokenService,
    password::{hash_password, verify_password},
};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Account registration, credential checks, and token issuance.
pub struct AuthService {
    db: Arc<dyn Database>,
    tokens: TokenService,
    cost: u32,
    /// Hash checked against when the username is unknown, so both failure
    /// paths cost one bcrypt verification.
    dummy_hash: String,
}

impl AuthService {
    /// Creates the service.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hash`] if `cost` is outside bcrypt's range.
    pub fn new(db: Arc<dyn Database>, tokens: TokenService, cost: u32) -> Result<Self, AuthError> {
        let dummy_hash = bcrypt::hash("flood-watch-dummy-password", cost)?;

        Ok(Self {
            db,
            tokens,
            cost,
            dummy_hash,
        })
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Creates an account. The password is hashed before it is stored.
    ///
    /// # Errors
    ///
    /// * [`AuthError::MissingCredentials`] if either field is empty
    /// * [`AuthError::PasswordTooShort`] if the password is under
    ///   [`MIN_PASSWORD_LEN`] characters
    /// * [`AuthError::UsernameTaken`] if the exact username exists
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }

        if users::find_user_by_username(self.db.as_ref(), username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let hash = hash_password(password.to_string(), self.cost).await?;
        let user = match users::insert_user(self.db.as_ref(), username, &hash, role).await {
            Ok(user) => user,
            Err(e) => {
                // A concurrent registration can take the name between the
                // check above and the insert; the UNIQUE constraint rejects
                // ours.
                if users::find_user_by_username(self.db.as_ref(), username)
                    .await?
                    .is_some()
                {
                    return Err(AuthError::UsernameTaken);
                }
                return Err(e.into());
            }
        };

        log::info!("Registered user {} as {}", user.username, user.role);

        Ok(user)
    }

    /// Checks a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown username
    /// and for a wrong password alike.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = users::find_user_by_username(self.db.as_ref(), username).await?;

        let hash = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |u| u.password_hash.clone());
        let verified = verify_password(password.to_string(), hash).await?;

        match user {
            Some(user) if verified => Ok(user),
            _ => {
                log::debug!("Failed login for {username}");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Authenticates and issues a token.
    ///
    /// # Errors
    ///
    /// See [`Self::authenticate`] and [`TokenService::issue`].
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AuthError> {
        let user = self.authenticate(username, password).await?;
        let token = self.tokens.issue(&user)?;
        Ok((token, user))
    }
}
