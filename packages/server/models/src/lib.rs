#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the flood watch server.
//!
//! Request types are deliberately loose (optional strings, raw JSON for
//! locations) so that bad input surfaces as a field-level validation error
//! from the incident service rather than an opaque deserialization failure.

use std::collections::BTreeMap;

use flood_watch_incident_models::Incident;
use flood_watch_user_models::{Role, User, UserRef};
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)` / `Some(Value::Null)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// `POST /api/auth/register` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Defaults to `responder`.
    pub role: Option<String>,
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The public part of an account returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

/// `POST /api/incidents` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIncidentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Must be an object with numeric `lat` and `lng`.
    pub location: Option<serde_json::Value>,
    pub priority: Option<String>,
    pub status: Option<String>,
    /// Commander id or username.
    pub assigned_commander: Option<String>,
    pub official_instructions: Option<String>,
    pub team_notes: Option<String>,
}

/// `PUT /api/incidents/{id}` body. Only fields present in the JSON change.
///
/// Every field keeps an explicit `null` (`Some(None)` or
/// `Some(Value::Null)`) apart from an absent one. Only
/// `assignedCommander` accepts `null`; elsewhere it is a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncidentRequest {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub location: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub official_instructions: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub team_notes: Option<Option<String>>,
    /// `Some(None)` unassigns; `Some(Some(id_or_username))` assigns.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_commander: Option<Option<String>>,
}

/// Raw `GET /api/incidents` query string. Parsed and validated by the
/// incident service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListParams {
    pub search_term: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_commander: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListResponse {
    pub incidents: Vec<Incident>,
    pub total_pages: u64,
    pub current_page: u32,
    pub total_incidents: u64,
}

/// A message plus the affected incident.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentResponse {
    pub message: String,
    pub incident: Incident,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `POST /api/incidents/{id}/rescue-steps` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RescueStepRequest {
    pub instruction: Option<String>,
}

/// `PUT /api/incidents/{id}/rescue-steps/{stepNumber}` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRescueStepRequest {
    pub instruction: Option<String>,
    pub is_completed: Option<bool>,
}

/// `GET /api/gis/risk` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskQueryParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskResponse {
    pub risk: String,
}

/// `GET /api/users` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersQueryParams {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserRef>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Body of every error response.
///
/// `message` and `error` carry the same text; clients read either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
    /// Field name to problem, for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: message.clone(),
            message,
            errors: None,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: BTreeMap<String, String>) -> Self {
        self.errors = Some(errors);
        self
    }
}
