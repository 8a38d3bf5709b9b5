//! User account queries.

use flood_watch_user_models::{Role, User};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, fold_case, format_timestamp, new_id};

const USER_COLUMNS: &str = "id, username, password_hash, role";

/// Inserts a new user and returns it.
///
/// The caller is responsible for hashing the password and for checking
/// username availability first; a duplicate username still fails here on
/// the `UNIQUE` constraint.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn insert_user(
    db: &dyn Database,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, DbError> {
    let id = new_id();
    let now = format_timestamp(&chrono::Utc::now());

    db.exec_raw_params(
        "INSERT INTO users (id, username, username_folded, password_hash, role, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        &[
            DatabaseValue::String(id.clone()),
            DatabaseValue::String(username.to_string()),
            DatabaseValue::String(fold_case(username)),
            DatabaseValue::String(password_hash.to_string()),
            DatabaseValue::String(role.to_string()),
            DatabaseValue::String(now),
        ],
    )
    .await?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role,
    })
}

/// Looks up a user by exact (case-sensitive) username.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn find_user_by_username(
    db: &dyn Database,
    username: &str,
) -> Result<Option<User>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? LIMIT 1"),
            &[DatabaseValue::String(username.to_string())],
        )
        .await?;

    rows.first().map(row_to_user).transpose()
}

/// Looks up a user by username, ignoring case (Unicode-aware).
///
/// If several accounts differ only by case, the oldest wins.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn find_user_by_username_ignore_case(
    db: &dyn Database,
    username: &str,
) -> Result<Option<User>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE username_folded = ?
                 ORDER BY seq
                 LIMIT 1"
            ),
            &[DatabaseValue::String(fold_case(username))],
        )
        .await?;

    rows.first().map(row_to_user).transpose()
}

/// Looks up a user by internal id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn find_user_by_id(db: &dyn Database, id: &str) -> Result<Option<User>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? LIMIT 1"),
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    rows.first().map(row_to_user).transpose()
}

/// Lists users ordered by username, optionally restricted to one role.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_users(db: &dyn Database, role: Option<Role>) -> Result<Vec<User>, DbError> {
    let rows = match role {
        Some(role) => {
            db.query_raw_params(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY username"),
                &[DatabaseValue::String(role.to_string())],
            )
            .await?
        }
        None => {
            db.query_raw_params(
                &format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"),
                &[],
            )
            .await?
        }
    };

    rows.iter().map(row_to_user).collect()
}

/// Converts a database row into a [`User`].
fn row_to_user(row: &switchy_database::Row) -> Result<User, DbError> {
    let role: String = row.to_value("role").unwrap_or_default();
    let role = role.parse().map_err(|_| DbError::Conversion {
        message: format!("Unknown role '{role}'"),
    })?;

    Ok(User {
        id: row.to_value("id").unwrap_or_default(),
        username: row.to_value("username").unwrap_or_default(),
        password_hash: row.to_value("password_hash").unwrap_or_default(),
        role,
    })
}
