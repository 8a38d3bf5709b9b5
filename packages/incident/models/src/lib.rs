#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident, rescue step, and incident query types.
//!
//! These are the shapes shared by the incident repository, the incident
//! service, and the HTTP layer. An [`Incident`] serializes exactly as the
//! API returns it: camelCase fields, `_id` for the identifier, and
//! populated `{_id, username, role}` objects for user references.

pub mod query;
pub mod rescue;

use chrono::{DateTime, Utc};
use flood_watch_user_models::UserRef;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use query::{
    IncidentFilter, IncidentPage, IncidentQuery, IncidentSort, Pagination, SortField, SortOrder,
};
pub use rescue::{RescueStep, RescueStepChanges, next_step_number};

/// How urgently an incident needs attention.
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
pub enum Priority {
    /// Can wait.
    Low,
    /// Default priority for new reports.
    #[default]
    Medium,
    /// Needs immediate attention.
    High,
}

/// Where an incident is in its lifecycle.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
    /// Newly reported, nobody assigned yet.
    #[default]
    Reported,
    /// A commander has been assigned.
    Assigned,
    /// Rescue work is under way.
    InProgress,
    /// The emergency has been dealt with.
    Resolved,
    /// Closed out; no further work expected.
    Closed,
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A reported emergency incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Internal id (UUID string). Immutable.
    #[serde(rename = "_id")]
    pub id: String,
    /// Short title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Where the incident is.
    pub location: Location,
    /// Who reported it. `None` only if the reporting account was removed.
    pub reported_by: Option<UserRef>,
    /// When it was reported. Immutable.
    pub timestamp: DateTime<Utc>,
    /// Priority.
    pub priority: Priority,
    /// Lifecycle status.
    pub status: Status,
    /// Commander overseeing the rescue, if any.
    pub assigned_commander: Option<UserRef>,
    /// Ordered rescue steps.
    pub rescue_steps: Vec<RescueStep>,
    /// Instructions issued by officials.
    pub official_instructions: String,
    /// Notes from the response team.
    pub team_notes: String,
}

/// A validated incident ready to be inserted.
///
/// The repository assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    /// Short title (non-blank).
    pub title: String,
    /// Description (non-blank).
    pub description: String,
    /// Location.
    pub location: Location,
    /// Id of the reporting user.
    pub reported_by: String,
    /// Priority.
    pub priority: Priority,
    /// Initial status.
    pub status: Status,
    /// Resolved id of the assigned commander.
    pub assigned_commander: Option<String>,
    /// Initial official instructions.
    pub official_instructions: String,
    /// Initial team notes.
    pub team_notes: String,
}

/// A partial update to an incident.
///
/// `None` means "leave unchanged". For `assigned_commander`,
/// `Some(None)` clears the assignment and `Some(Some(id))` sets it to an
/// already-resolved user id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New location (always both coordinates).
    pub location: Option<Location>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New status.
    pub status: Option<Status>,
    /// New official instructions.
    pub official_instructions: Option<String>,
    /// New team notes.
    pub team_notes: Option<String>,
    /// New commander assignment.
    pub assigned_commander: Option<Option<String>>,
}

impl IncidentChanges {
    /// Returns `true` if no field is being changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.official_instructions.is_none()
            && self.team_notes.is_none()
            && self.assigned_commander.is_none()
    }
}
