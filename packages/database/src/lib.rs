#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` persistence for users and incidents.
//!
//! Uses `switchy_database` for all database operations. Each request works
//! on single-row statements; there are no multi-statement transactions, so
//! concurrent writers to the same incident resolve last-write-wins.

pub mod incidents;
pub mod users;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

/// Default path for the application database.
pub const DEFAULT_DB_PATH: &str = "data/flood_watch.db";

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The database could not be opened.
    #[error("Failed to open database: {0}")]
    Open(String),

    /// An I/O operation failed (e.g., creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column encoding/decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens (or creates) the `SQLite` database at `path` and ensures the
/// schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database file cannot be created or the
/// schema DDL fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Open(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    log::info!("Opened database at {}", path.display());

    Ok(db)
}

/// Creates all tables if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    // `username` keeps the default BINARY collation: storage is
    // case-sensitive. Case-insensitive lookups and search go through the
    // `*_folded` columns, which hold `fold_case` of their source column.
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS users (
            seq           INTEGER PRIMARY KEY AUTOINCREMENT,
            id            TEXT NOT NULL UNIQUE,
            username      TEXT NOT NULL UNIQUE,
            username_folded TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL,
            created_at    TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS incidents (
            seq                   INTEGER PRIMARY KEY AUTOINCREMENT,
            id                    TEXT NOT NULL UNIQUE,
            title                 TEXT NOT NULL,
            description           TEXT NOT NULL,
            title_folded          TEXT NOT NULL,
            description_folded    TEXT NOT NULL,
            lat                   REAL NOT NULL,
            lng                   REAL NOT NULL,
            reported_by           TEXT NOT NULL,
            timestamp             TEXT NOT NULL,
            priority              TEXT NOT NULL DEFAULT 'medium',
            status                TEXT NOT NULL DEFAULT 'reported',
            assigned_commander    TEXT,
            rescue_steps          TEXT NOT NULL DEFAULT '[]',
            official_instructions TEXT NOT NULL DEFAULT '',
            team_notes            TEXT NOT NULL DEFAULT ''
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_users_username_folded
         ON users (username_folded)",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_incidents_timestamp
         ON incidents (timestamp)",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_incidents_commander
         ON incidents (assigned_commander)",
    )
    .await?;

    Ok(())
}

/// Folds `s` for case-insensitive comparison.
///
/// SQLite's `NOCASE` and `LIKE` only fold ASCII, so folding happens here
/// with full Unicode lowercasing and is stored alongside the original.
#[must_use]
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// Formats a timestamp for storage.
///
/// Fixed microsecond precision and a `Z` suffix keep lexical and
/// chronological order identical.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if the string is not RFC 3339.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid timestamp '{s}': {e}"),
        })
}

/// Returns `true` if `id` has the shape of an internal id.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

/// Generates a new internal id.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use switchy_database::Database;

    /// Opens a fresh database in a unique temp directory.
    pub async fn temp_db(name: &str) -> (Box<dyn Database>, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "flood_watch_db_{name}_{}",
            uuid::Uuid::new_v4()
        ));
        let db = super::open_db(&dir.join("test.db")).await.unwrap();
        (db, dir)
    }
}
