//! Signed session tokens.

use chrono::{DateTime, Duration, Utc};
use flood_watch_user_models::{Role, User};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Default token lifetime in hours.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Internal user id.
    pub id: String,
    pub username: String,
    pub role: Role,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies HS256 tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Signs a token for `user`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Sign`] if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Sign)
    }

    /// Checks the signature and expiry of `token` and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token is malformed,
    /// expired, or was not signed with this service's secret.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: "0b7f3c55-4c1e-4d8e-9d6a-1f2e3d4c5b6a".to_string(),
            username: "alice".to_string(),
            password_hash: String::new(),
            role: Role::Coordinator,
        }
    }

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::hours(DEFAULT_TTL_HOURS))
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let token = tokens.issue(&alice()).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.id, alice().id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Coordinator);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let token = tokens
            .issue_at(&alice(), Utc::now() - Duration::hours(25))
            .unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenService::new("another-secret", Duration::hours(1));
        let token = other.issue(&alice()).unwrap();
        assert!(service().verify(&token).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(service().verify("").is_err());
        assert!(service().verify("not.a.token").is_err());

        let mut token = service().issue(&alice()).unwrap();
        token.push('x');
        assert!(service().verify(&token).is_err());
    }
}
