//! Incident queries.
//!
//! Reads join `users` twice so every returned [`Incident`] carries populated
//! reporter and commander references. Rescue steps live in a JSON text
//! column and are rewritten wholesale by [`save_rescue_steps`].

use std::fmt::Write as _;

use flood_watch_incident_models::{
    Incident, IncidentChanges, IncidentFilter, IncidentQuery, Location, NewIncident, RescueStep,
    SortField, SortOrder,
};
use flood_watch_user_models::UserRef;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, fold_case, format_timestamp, new_id, parse_timestamp};

const INCIDENT_SELECT: &str = "SELECT i.id, i.title, i.description, i.lat, i.lng, i.timestamp,
        i.priority, i.status, i.rescue_steps, i.official_instructions, i.team_notes,
        r.id AS reporter_id, r.username AS reporter_username, r.role AS reporter_role,
        c.id AS commander_id, c.username AS commander_username, c.role AS commander_role
    FROM incidents i
    LEFT JOIN users r ON r.id = i.reported_by
    LEFT JOIN users c ON c.id = i.assigned_commander";

/// Inserts a new incident and returns it with user references populated.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn insert_incident(db: &dyn Database, new: &NewIncident) -> Result<Incident, DbError> {
    let id = new_id();
    let timestamp = format_timestamp(&chrono::Utc::now());

    db.exec_raw_params(
        "INSERT INTO incidents (
            id, title, description, title_folded, description_folded,
            lat, lng, reported_by, timestamp, priority, status,
            assigned_commander, rescue_steps, official_instructions, team_notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)",
        &[
            DatabaseValue::String(id.clone()),
            DatabaseValue::String(new.title.clone()),
            DatabaseValue::String(new.description.clone()),
            DatabaseValue::String(fold_case(&new.title)),
            DatabaseValue::String(fold_case(&new.description)),
            DatabaseValue::Real64(new.location.lat),
            DatabaseValue::Real64(new.location.lng),
            DatabaseValue::String(new.reported_by.clone()),
            DatabaseValue::String(timestamp),
            DatabaseValue::String(new.priority.to_string()),
            DatabaseValue::String(new.status.to_string()),
            opt_string(new.assigned_commander.as_deref()),
            DatabaseValue::String(new.official_instructions.clone()),
            DatabaseValue::String(new.team_notes.clone()),
        ],
    )
    .await?;

    get_incident(db, &id)
        .await?
        .ok_or_else(|| DbError::Conversion {
            message: format!("Incident {id} vanished after insert"),
        })
}

/// Fetches a single incident by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn get_incident(db: &dyn Database, id: &str) -> Result<Option<Incident>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("{INCIDENT_SELECT} WHERE i.id = ?"),
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    rows.first().map(row_to_incident).transpose()
}

/// Returns one page of incidents matching `query`.
///
/// Ties on the sort column fall back to insertion order in the same
/// direction, so paging is stable.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn query_incidents(
    db: &dyn Database,
    query: &IncidentQuery,
) -> Result<Vec<Incident>, DbError> {
    let mut sql = String::from(INCIDENT_SELECT);
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, &query.filter);

    let direction = match query.sort.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    write!(
        sql,
        " ORDER BY {} {direction}, i.seq {direction} LIMIT ? OFFSET ?",
        sort_column(query.sort.field)
    )
    .unwrap();

    params.push(DatabaseValue::Int64(i64::from(query.pagination.limit)));
    params.push(DatabaseValue::Int64(
        i64::try_from(query.pagination.offset()).unwrap_or(i64::MAX),
    ));

    let rows = db.query_raw_params(&sql, &params).await?;

    rows.iter().map(row_to_incident).collect()
}

/// Counts incidents matching `filter`, ignoring pagination.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_incidents(db: &dyn Database, filter: &IncidentFilter) -> Result<u64, DbError> {
    let mut sql = String::from("SELECT COUNT(*) AS cnt FROM incidents i");
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, filter);

    let rows = db.query_raw_params(&sql, &params).await?;
    let count: i64 = rows.first().map_or(0, |r| r.to_value("cnt").unwrap_or(0));

    Ok(u64::try_from(count).unwrap_or(0))
}

/// Applies `changes` to the incident with `id`.
///
/// Returns `false` if no such incident exists. An empty change set only
/// checks existence.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn update_incident(
    db: &dyn Database,
    id: &str,
    changes: &IncidentChanges,
) -> Result<bool, DbError> {
    if changes.is_empty() {
        return incident_exists(db, id).await;
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut params = Vec::new();

    if let Some(title) = &changes.title {
        sets.push("title = ?");
        params.push(DatabaseValue::String(title.clone()));
        sets.push("title_folded = ?");
        params.push(DatabaseValue::String(fold_case(title)));
    }
    if let Some(description) = &changes.description {
        sets.push("description = ?");
        params.push(DatabaseValue::String(description.clone()));
        sets.push("description_folded = ?");
        params.push(DatabaseValue::String(fold_case(description)));
    }
    if let Some(location) = changes.location {
        sets.push("lat = ?");
        params.push(DatabaseValue::Real64(location.lat));
        sets.push("lng = ?");
        params.push(DatabaseValue::Real64(location.lng));
    }
    if let Some(priority) = changes.priority {
        sets.push("priority = ?");
        params.push(DatabaseValue::String(priority.to_string()));
    }
    if let Some(status) = changes.status {
        sets.push("status = ?");
        params.push(DatabaseValue::String(status.to_string()));
    }
    if let Some(instructions) = &changes.official_instructions {
        sets.push("official_instructions = ?");
        params.push(DatabaseValue::String(instructions.clone()));
    }
    if let Some(notes) = &changes.team_notes {
        sets.push("team_notes = ?");
        params.push(DatabaseValue::String(notes.clone()));
    }
    if let Some(commander) = &changes.assigned_commander {
        sets.push("assigned_commander = ?");
        params.push(opt_string(commander.as_deref()));
    }

    params.push(DatabaseValue::String(id.to_string()));
    let sql = format!("UPDATE incidents SET {} WHERE id = ?", sets.join(", "));

    let updated = db.exec_raw_params(&sql, &params).await?;

    Ok(updated > 0)
}

/// Deletes the incident with `id`. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn delete_incident(db: &dyn Database, id: &str) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM incidents WHERE id = ?",
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    Ok(deleted > 0)
}

/// Replaces the rescue step list of the incident with `id`.
///
/// Returns `false` if the incident does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if encoding or the statement fails.
pub async fn save_rescue_steps(
    db: &dyn Database,
    id: &str,
    steps: &[RescueStep],
) -> Result<bool, DbError> {
    let json = serde_json::to_string(steps)?;

    let updated = db
        .exec_raw_params(
            "UPDATE incidents SET rescue_steps = ? WHERE id = ?",
            &[
                DatabaseValue::String(json),
                DatabaseValue::String(id.to_string()),
            ],
        )
        .await?;

    Ok(updated > 0)
}

async fn incident_exists(db: &dyn Database, id: &str) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT 1 AS found FROM incidents WHERE id = ?",
            &[DatabaseValue::String(id.to_string())],
        )
        .await?;

    Ok(!rows.is_empty())
}

/// Appends `WHERE` conditions for `filter` to `sql`.
fn push_filter(sql: &mut String, params: &mut Vec<DatabaseValue>, filter: &IncidentFilter) {
    sql.push_str(" WHERE 1=1");

    if let Some(status) = filter.status {
        sql.push_str(" AND i.status = ?");
        params.push(DatabaseValue::String(status.to_string()));
    }
    if let Some(priority) = filter.priority {
        sql.push_str(" AND i.priority = ?");
        params.push(DatabaseValue::String(priority.to_string()));
    }
    if let Some(commander) = &filter.assigned_commander {
        sql.push_str(" AND i.assigned_commander = ?");
        params.push(DatabaseValue::String(commander.clone()));
    }
    if let Some(term) = filter.search_term.as_deref().filter(|t| !t.is_empty()) {
        sql.push_str(" AND (i.title_folded LIKE ? ESCAPE '\\'");
        sql.push_str(" OR i.description_folded LIKE ? ESCAPE '\\')");
        let pattern = format!("%{}%", escape_like(&fold_case(term)));
        params.push(DatabaseValue::String(pattern.clone()));
        params.push(DatabaseValue::String(pattern));
    }
}

/// Escapes `LIKE` wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Id => "i.id",
        SortField::Title => "i.title",
        SortField::Description => "i.description",
        SortField::Timestamp => "i.timestamp",
        SortField::Priority => "i.priority",
        SortField::Status => "i.status",
        SortField::AssignedCommander => "i.assigned_commander",
        SortField::OfficialInstructions => "i.official_instructions",
        SortField::TeamNotes => "i.team_notes",
    }
}

fn opt_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.to_string()))
}

/// Builds a [`UserRef`] from one of the joined user column groups.
fn row_to_user_ref(row: &switchy_database::Row, prefix: &str) -> Option<UserRef> {
    let id: Option<String> = row.to_value(&format!("{prefix}_id")).unwrap_or(None);
    let username: Option<String> = row.to_value(&format!("{prefix}_username")).unwrap_or(None);
    let role: Option<String> = row.to_value(&format!("{prefix}_role")).unwrap_or(None);

    Some(UserRef {
        id: id?,
        username: username?,
        role: role?.parse().ok()?,
    })
}

/// Converts a database row into an [`Incident`].
fn row_to_incident(row: &switchy_database::Row) -> Result<Incident, DbError> {
    let timestamp: String = row.to_value("timestamp").unwrap_or_default();
    let priority: String = row.to_value("priority").unwrap_or_default();
    let status: String = row.to_value("status").unwrap_or_default();
    let steps_json: String = row.to_value("rescue_steps").unwrap_or_default();

    let rescue_steps = if steps_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&steps_json)?
    };

    Ok(Incident {
        id: row.to_value("id").unwrap_or_default(),
        title: row.to_value("title").unwrap_or_default(),
        description: row.to_value("description").unwrap_or_default(),
        location: Location::new(
            row.to_value("lat").unwrap_or(0.0),
            row.to_value("lng").unwrap_or(0.0),
        ),
        reported_by: row_to_user_ref(row, "reporter"),
        timestamp: parse_timestamp(&timestamp)?,
        priority: priority.parse().map_err(|_| DbError::Conversion {
            message: format!("Unknown priority '{priority}'"),
        })?,
        status: status.parse().map_err(|_| DbError::Conversion {
            message: format!("Unknown status '{status}'"),
        })?,
        assigned_commander: row_to_user_ref(row, "commander"),
        rescue_steps,
        official_instructions: row.to_value("official_instructions").unwrap_or_default(),
        team_notes: row.to_value("team_notes").unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use flood_watch_incident_models::{IncidentSort, Pagination, Priority, Status};
    use flood_watch_user_models::{Role, User};

    use super::*;
    use crate::test_support::temp_db;
    use crate::users::insert_user;

    fn new_incident(title: &str, reporter: &User) -> NewIncident {
        NewIncident {
            title: title.to_string(),
            description: format!("{title} description"),
            location: Location::new(29.76, -95.37),
            reported_by: reporter.id.clone(),
            priority: Priority::Medium,
            status: Status::Reported,
            assigned_commander: None,
            official_instructions: String::new(),
            team_notes: String::new(),
        }
    }

    async fn seed_reporter(db: &dyn Database) -> User {
        insert_user(db, "alice", "hash", Role::Responder).await.unwrap()
    }

    #[tokio::test]
    async fn insert_populates_references() {
        let (db, dir) = temp_db("incidents_insert").await;
        let alice = seed_reporter(db.as_ref()).await;
        let cmdr = insert_user(db.as_ref(), "carol", "hash", Role::Commander)
            .await
            .unwrap();

        let mut new = new_incident("Flooded road", &alice);
        new.assigned_commander = Some(cmdr.id.clone());
        let incident = insert_incident(db.as_ref(), &new).await.unwrap();

        assert_eq!(incident.title, "Flooded road");
        assert_eq!(incident.reported_by, Some(alice.to_ref()));
        assert_eq!(incident.assigned_commander, Some(cmdr.to_ref()));
        assert_eq!(incident.location, Location::new(29.76, -95.37));
        assert!(incident.rescue_steps.is_empty());

        let fetched = get_incident(db.as_ref(), &incident.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, incident);

        assert!(get_incident(db.as_ref(), &new_id()).await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn paginates_with_total_count() {
        let (db, dir) = temp_db("incidents_page").await;
        let alice = seed_reporter(db.as_ref()).await;
        for n in 0..25 {
            insert_incident(db.as_ref(), &new_incident(&format!("incident {n:02}"), &alice))
                .await
                .unwrap();
        }

        let query = IncidentQuery {
            pagination: Pagination { page: 2, limit: 10 },
            ..IncidentQuery::default()
        };
        let page = query_incidents(db.as_ref(), &query).await.unwrap();
        assert_eq!(page.len(), 10);
        // Newest first: page 2 starts at the 11th newest.
        assert_eq!(page[0].title, "incident 14");

        let last = IncidentQuery {
            pagination: Pagination { page: 3, limit: 10 },
            ..IncidentQuery::default()
        };
        assert_eq!(query_incidents(db.as_ref(), &last).await.unwrap().len(), 5);

        let beyond = IncidentQuery {
            pagination: Pagination { page: 4, limit: 10 },
            ..IncidentQuery::default()
        };
        assert!(query_incidents(db.as_ref(), &beyond).await.unwrap().is_empty());

        assert_eq!(
            count_incidents(db.as_ref(), &IncidentFilter::default())
                .await
                .unwrap(),
            25
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn sorts_by_requested_field() {
        let (db, dir) = temp_db("incidents_sort").await;
        let alice = seed_reporter(db.as_ref()).await;
        for title in ["bravo", "alpha", "charlie"] {
            insert_incident(db.as_ref(), &new_incident(title, &alice))
                .await
                .unwrap();
        }

        let mut query = IncidentQuery {
            sort: IncidentSort {
                field: SortField::Title,
                order: SortOrder::Asc,
            },
            ..IncidentQuery::default()
        };
        let titles = |incidents: Vec<Incident>| -> Vec<String> {
            incidents.into_iter().map(|i| i.title).collect()
        };

        let asc = query_incidents(db.as_ref(), &query).await.unwrap();
        assert_eq!(titles(asc), ["alpha", "bravo", "charlie"]);

        query.sort.order = SortOrder::Desc;
        let desc = query_incidents(db.as_ref(), &query).await.unwrap();
        assert_eq!(titles(desc), ["charlie", "bravo", "alpha"]);

        let newest = query_incidents(db.as_ref(), &IncidentQuery::default())
            .await
            .unwrap();
        assert_eq!(titles(newest), ["charlie", "alpha", "bravo"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn filters_and_searches() {
        let (conn, dir) = temp_db("incidents_filter").await;
        let db = conn.as_ref();
        let alice = seed_reporter(db).await;
        let cmdr = insert_user(db, "carol", "hash", Role::Commander)
            .await
            .unwrap();

        let mut high = new_incident("Bridge collapse", &alice);
        high.priority = Priority::High;
        high.assigned_commander = Some(cmdr.id.clone());
        insert_incident(db, &high).await.unwrap();

        let mut resolved = new_incident("Basement water", &alice);
        resolved.status = Status::Resolved;
        resolved.description = "100% submerged_car".to_string();
        insert_incident(db, &resolved).await.unwrap();

        insert_incident(db, &new_incident("Stranded hikers", &alice))
            .await
            .unwrap();

        let count = |filter: IncidentFilter| async move { count_incidents(db, &filter).await.unwrap() };

        assert_eq!(
            count(IncidentFilter {
                priority: Some(Priority::High),
                ..IncidentFilter::default()
            })
            .await,
            1
        );
        assert_eq!(
            count(IncidentFilter {
                status: Some(Status::Resolved),
                ..IncidentFilter::default()
            })
            .await,
            1
        );
        assert_eq!(
            count(IncidentFilter {
                assigned_commander: Some(cmdr.id.clone()),
                ..IncidentFilter::default()
            })
            .await,
            1
        );
        // Case-insensitive, matches title or description.
        assert_eq!(
            count(IncidentFilter {
                search_term: Some("WATER".to_string()),
                ..IncidentFilter::default()
            })
            .await,
            1
        );
        assert_eq!(
            count(IncidentFilter {
                search_term: Some("description".to_string()),
                ..IncidentFilter::default()
            })
            .await,
            2
        );
        // Wildcards are literal.
        assert_eq!(
            count(IncidentFilter {
                search_term: Some("%".to_string()),
                ..IncidentFilter::default()
            })
            .await,
            1
        );
        assert_eq!(
            count(IncidentFilter {
                search_term: Some("d_car".to_string()),
                ..IncidentFilter::default()
            })
            .await,
            1
        );
        assert_eq!(
            count(IncidentFilter {
                search_term: Some("e_c".to_string()),
                ..IncidentFilter::default()
            })
            .await,
            0
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let (conn, dir) = temp_db("incidents_unicode").await;
        let db = conn.as_ref();
        let alice = seed_reporter(db).await;
        let incident = insert_incident(db, &new_incident("Überflutung am Fluss", &alice))
            .await
            .unwrap();
        insert_incident(db, &new_incident("Dry cellar", &alice))
            .await
            .unwrap();

        let search = |term: &str| IncidentFilter {
            search_term: Some(term.to_string()),
            ..IncidentFilter::default()
        };

        assert_eq!(count_incidents(db, &search("überflutung")).await.unwrap(), 1);
        assert_eq!(count_incidents(db, &search("ÜBERFLUTUNG")).await.unwrap(), 1);

        let renamed = IncidentChanges {
            title: Some("Évacuation urgente".to_string()),
            ..IncidentChanges::default()
        };
        assert!(update_incident(db, &incident.id, &renamed).await.unwrap());
        assert_eq!(count_incidents(db, &search("überflutung")).await.unwrap(), 0);
        assert_eq!(count_incidents(db, &search("évacuation")).await.unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn sequential_creates_have_unique_ids_and_ordered_timestamps() {
        let (db, dir) = temp_db("incidents_sequence").await;
        let alice = seed_reporter(db.as_ref()).await;

        let mut created = Vec::new();
        for n in 0..20 {
            let new = new_incident(&format!("report {n}"), &alice);
            created.push(insert_incident(db.as_ref(), &new).await.unwrap());
        }

        let ids: BTreeSet<_> = created.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), created.len());

        for pair in created.windows(2) {
            assert!(
                pair[0].timestamp <= pair[1].timestamp,
                "{} came after {}",
                pair[0].timestamp,
                pair[1].timestamp
            );
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (db, dir) = temp_db("incidents_update").await;
        let alice = seed_reporter(db.as_ref()).await;
        let cmdr = insert_user(db.as_ref(), "carol", "hash", Role::Commander)
            .await
            .unwrap();
        let incident = insert_incident(db.as_ref(), &new_incident("Levee breach", &alice))
            .await
            .unwrap();

        let changes = IncidentChanges {
            status: Some(Status::Assigned),
            location: Some(Location::new(1.5, 2.5)),
            assigned_commander: Some(Some(cmdr.id.clone())),
            ..IncidentChanges::default()
        };
        assert!(update_incident(db.as_ref(), &incident.id, &changes).await.unwrap());

        let updated = get_incident(db.as_ref(), &incident.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, Status::Assigned);
        assert_eq!(updated.location, Location::new(1.5, 2.5));
        assert_eq!(updated.assigned_commander, Some(cmdr.to_ref()));
        assert_eq!(updated.title, "Levee breach");

        let clear = IncidentChanges {
            assigned_commander: Some(None),
            ..IncidentChanges::default()
        };
        assert!(update_incident(db.as_ref(), &incident.id, &clear).await.unwrap());
        let cleared = get_incident(db.as_ref(), &incident.id)
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.assigned_commander.is_none());

        assert!(
            update_incident(db.as_ref(), &incident.id, &IncidentChanges::default())
                .await
                .unwrap()
        );
        assert!(
            !update_incident(db.as_ref(), &new_id(), &changes)
                .await
                .unwrap()
        );

        assert!(delete_incident(db.as_ref(), &incident.id).await.unwrap());
        assert!(!delete_incident(db.as_ref(), &incident.id).await.unwrap());
        assert!(get_incident(db.as_ref(), &incident.id).await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn rescue_steps_are_persisted() {
        let (db, dir) = temp_db("incidents_steps").await;
        let alice = seed_reporter(db.as_ref()).await;
        let incident = insert_incident(db.as_ref(), &new_incident("Roof rescue", &alice))
            .await
            .unwrap();

        let mut steps = vec![
            RescueStep::new(1, "Deploy boat"),
            RescueStep::new(2, "Evacuate family"),
        ];
        steps[0].is_completed = true;
        assert!(
            save_rescue_steps(db.as_ref(), &incident.id, &steps)
                .await
                .unwrap()
        );

        let fetched = get_incident(db.as_ref(), &incident.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.rescue_steps, steps);

        assert!(!save_rescue_steps(db.as_ref(), &new_id(), &steps).await.unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
