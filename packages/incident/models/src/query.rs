//! Incident list query types: filter, sort, and pagination.

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{Incident, Priority, Status};

/// Default number of incidents per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Exact-match and search criteria for listing incidents.
///
/// All present criteria must match (logical AND). `search_term` matches
/// case-insensitively against the title OR the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    /// Exact status.
    pub status: Option<Status>,
    /// Exact priority.
    pub priority: Option<Priority>,
    /// Resolved id of the assigned commander.
    pub assigned_commander: Option<String>,
    /// Literal substring to look for in title or description.
    pub search_term: Option<String>,
}

/// Fields an incident list can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    /// Incident id.
    #[strum(serialize = "_id")]
    Id,
    /// Title.
    Title,
    /// Description.
    Description,
    /// Report time.
    #[default]
    Timestamp,
    /// Priority name.
    Priority,
    /// Status name.
    Status,
    /// Assigned commander id.
    AssignedCommander,
    /// Official instructions.
    OfficialInstructions,
    /// Team notes.
    TeamNotes,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// Sort key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncidentSort {
    /// Field to sort by.
    pub field: SortField,
    /// Direction.
    pub order: SortOrder,
}

impl Default for IncidentSort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::Timestamp,
            order: SortOrder::Desc,
        }
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: u32,
    /// Page size, at least 1.
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Number of rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Number of pages needed to show `total` items.
    #[must_use]
    pub fn total_pages(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(u64::from(self.limit))
    }
}

/// A complete incident list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentQuery {
    /// What to match.
    pub filter: IncidentFilter,
    /// How to order.
    pub sort: IncidentSort,
    /// Which page.
    pub pagination: Pagination,
}

/// One page of incidents plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentPage {
    /// Incidents on this page.
    pub incidents: Vec<Incident>,
    /// Matches across all pages.
    pub total: u64,
}
