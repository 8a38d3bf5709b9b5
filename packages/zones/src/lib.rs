#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Flood-risk zones: storage, download, and risk classification.
//!
//! Zones are kept as a single `GeoJSON` `FeatureCollection` document on
//! disk. Each feature is a polygon tagged with a `risk` property
//! (`"High"`, `"Medium"`, `"Low"`, or any free text). The
//! [`classifier::RiskClassifier`] answers "which risk applies at this
//! coordinate" with point-in-polygon lookups over an R-tree.

pub mod classifier;
pub mod download;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use classifier::{NO_RISK, RiskClassifier, UNKNOWN_RISK, classify};
pub use store::ZoneStore;

/// Errors that can occur while reading, writing, or fetching zone data.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// No zone data has been stored yet.
    #[error("Flood zone data not found at {}", path.display())]
    NotFound {
        /// Where the data was expected.
        path: PathBuf,
    },

    /// Reading or writing the zone file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored or supplied data is not a `FeatureCollection`.
    #[error("Invalid flood zone data: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Downloading zone data failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
