#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! User account and role types.
//!
//! Every account carries exactly one [`Role`]. Roles gate which incident
//! operations a user may perform; the role matrix itself lives in the auth
//! crate.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The role a user account holds.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Field responder. Can report incidents and tick off rescue steps.
    #[default]
    Responder,
    /// Coordinates response efforts and assigns commanders.
    Coordinator,
    /// Government official with authority over incidents.
    Official,
    /// Commands the rescue effort on assigned incidents.
    Commander,
}

impl Role {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Responder,
            Self::Coordinator,
            Self::Official,
            Self::Commander,
        ]
    }
}

/// A stored user account.
///
/// `password_hash` is never serialized; API responses use [`UserRef`] or
/// hand-picked fields instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Internal id (UUID string).
    #[serde(rename = "_id")]
    pub id: String,
    /// Username as entered at registration (case preserved).
    pub username: String,
    /// Salted password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account role.
    pub role: Role,
}

impl User {
    /// Returns the public reference form of this user.
    #[must_use]
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// A user as embedded in other documents (e.g. an incident's reporter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Internal id (UUID string).
    #[serde(rename = "_id")]
    pub id: String,
    /// Username.
    pub username: String,
    /// Account role.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_lowercase_names() {
        for role in Role::all() {
            let parsed: Role = role.as_ref().parse().unwrap();
            assert_eq!(parsed, *role);
        }
        assert!("Administrator".parse::<Role>().is_err());
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: "u-1".to_string(),
            username: "alice".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            role: Role::Commander,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["_id"], "u-1");
        assert_eq!(json["role"], "commander");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
    }
}
