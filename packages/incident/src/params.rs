//! Parsing and validation of raw request input.
//!
//! Every value arrives as an optional string or untyped JSON. Empty strings
//! count as absent, which is how query strings like `?status=` behave.
//! Anything else that fails to parse is reported against its field name.

use std::collections::BTreeMap;
use std::str::FromStr;

use flood_watch_incident_models::{
    IncidentFilter, IncidentQuery, IncidentSort, Location, Pagination, SortField, SortOrder,
};
use flood_watch_server_models::IncidentListParams;

use crate::ServiceError;

/// Message for a missing or non-numeric location.
pub const INVALID_LOCATION: &str = "Invalid location data. Must include numeric lat & lng.";

/// Field-level validation errors collected while parsing one request.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if any error was recorded.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }

    /// Parses an optional enum-like value, recording an error on failure.
    pub fn parse<T: FromStr>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        let value = non_empty(value)?;
        value.parse().map_or_else(
            |_| {
                self.add(field, format!("'{value}' is not a valid {field}"));
                None
            },
            Some,
        )
    }

    /// Parses a field of an update body.
    ///
    /// Absent yields `None` without error. Unlike query strings, an explicit
    /// `null` or empty string is an error here: the field was sent, so it
    /// must carry a valid value.
    pub fn parse_present<T: FromStr>(
        &mut self,
        field: &str,
        value: Option<Option<&str>>,
    ) -> Option<T> {
        match value? {
            Some(v) if !v.is_empty() => self.parse(field, Some(v)),
            _ => {
                self.add(field, format!("{field} cannot be empty"));
                None
            }
        }
    }

    /// Parses an optional positive integer, recording an error on failure.
    fn parse_positive(&mut self, field: &str, value: Option<&str>) -> Option<u32> {
        let value = non_empty(value)?;
        match value.trim().parse::<u32>() {
            Ok(n) if n >= 1 => Some(n),
            _ => {
                self.add(field, format!("{field} must be a positive integer"));
                None
            }
        }
    }
}

/// Returns `value` unless it is absent or empty.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Returns `true` if `value` has visible content.
#[must_use]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Reads a `{lat, lng}` object where both members are JSON numbers.
///
/// Strings that look numeric are rejected.
#[must_use]
pub fn parse_location(value: &serde_json::Value) -> Option<Location> {
    let lat = value.get("lat")?.as_f64()?;
    let lng = value.get("lng")?.as_f64()?;
    Some(Location::new(lat, lng))
}

/// The parsed list query. The commander filter is still the raw id or
/// username because resolving it needs the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub query: IncidentQuery,
    pub commander: Option<String>,
}

/// Parses the incident list query string.
///
/// Without `sortBy` the list is newest first. With `sortBy`, `order`
/// defaults to ascending.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] naming every unparseable parameter.
pub fn parse_list_params(params: &IncidentListParams) -> Result<ListQuery, ServiceError> {
    let mut errors = FieldErrors::default();

    let status = errors.parse("status", params.status.as_deref());
    let priority = errors.parse("priority", params.priority.as_deref());
    let sort_field: Option<SortField> = errors.parse("sortBy", params.sort_by.as_deref());
    let order: Option<SortOrder> = errors.parse("order", params.order.as_deref());
    let page = errors.parse_positive("page", params.page.as_deref());
    let limit = errors.parse_positive("limit", params.limit.as_deref());

    errors.into_result()?;

    let sort = sort_field.map_or_else(IncidentSort::default, |field| IncidentSort {
        field,
        order: order.unwrap_or(SortOrder::Asc),
    });

    let defaults = Pagination::default();

    Ok(ListQuery {
        query: IncidentQuery {
            filter: IncidentFilter {
                status,
                priority,
                assigned_commander: None,
                search_term: non_empty(params.search_term.as_deref()).map(ToString::to_string),
            },
            sort,
            pagination: Pagination {
                page: page.unwrap_or(defaults.page),
                limit: limit.unwrap_or(defaults.limit),
            },
        },
        commander: non_empty(params.assigned_commander.as_deref()).map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use flood_watch_incident_models::{Priority, Status};

    use super::*;

    fn params() -> IncidentListParams {
        IncidentListParams::default()
    }

    #[test]
    fn defaults() {
        let parsed = parse_list_params(&params()).unwrap();
        assert_eq!(parsed.query, IncidentQuery::default());
        assert!(parsed.commander.is_none());
    }

    #[test]
    fn parses_every_parameter() {
        let parsed = parse_list_params(&IncidentListParams {
            search_term: Some("bridge".to_string()),
            status: Some("in-progress".to_string()),
            priority: Some("high".to_string()),
            assigned_commander: Some("carol".to_string()),
            sort_by: Some("priority".to_string()),
            order: Some("desc".to_string()),
            page: Some("3".to_string()),
            limit: Some("5".to_string()),
        })
        .unwrap();

        let query = parsed.query;
        assert_eq!(query.filter.status, Some(Status::InProgress));
        assert_eq!(query.filter.priority, Some(Priority::High));
        assert_eq!(query.filter.search_term.as_deref(), Some("bridge"));
        assert_eq!(query.sort.field, SortField::Priority);
        assert_eq!(query.sort.order, SortOrder::Desc);
        assert_eq!(query.pagination, Pagination { page: 3, limit: 5 });
        assert_eq!(parsed.commander.as_deref(), Some("carol"));
    }

    #[test]
    fn sort_by_defaults_to_ascending() {
        let parsed = parse_list_params(&IncidentListParams {
            sort_by: Some("title".to_string()),
            ..params()
        })
        .unwrap();
        assert_eq!(parsed.query.sort.order, SortOrder::Asc);

        // Order alone does not change the default sort.
        let parsed = parse_list_params(&IncidentListParams {
            order: Some("asc".to_string()),
            ..params()
        })
        .unwrap();
        assert_eq!(parsed.query.sort, IncidentSort::default());
    }

    #[test]
    fn empty_values_are_ignored() {
        let parsed = parse_list_params(&IncidentListParams {
            status: Some(String::new()),
            search_term: Some(String::new()),
            assigned_commander: Some(String::new()),
            page: Some(String::new()),
            ..params()
        })
        .unwrap();
        assert_eq!(parsed.query, IncidentQuery::default());
        assert!(parsed.commander.is_none());
    }

    #[test]
    fn reports_every_bad_parameter() {
        let err = parse_list_params(&IncidentListParams {
            status: Some("flooded".to_string()),
            priority: Some("urgent".to_string()),
            sort_by: Some("password".to_string()),
            order: Some("sideways".to_string()),
            page: Some("0".to_string()),
            limit: Some("ten".to_string()),
            ..params()
        })
        .unwrap_err();

        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<_> = errors.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            ["limit", "order", "page", "priority", "sortBy", "status"]
        );
        assert_eq!(errors["status"], "'flooded' is not a valid status");
    }

    #[test]
    fn location_requires_numbers() {
        assert_eq!(
            parse_location(&serde_json::json!({"lat": 29.7, "lng": -95.3})),
            Some(Location::new(29.7, -95.3))
        );
        assert_eq!(
            parse_location(&serde_json::json!({"lat": 1, "lng": 2})),
            Some(Location::new(1.0, 2.0))
        );
        assert!(parse_location(&serde_json::json!({"lat": 29.7})).is_none());
        assert!(parse_location(&serde_json::json!({"lat": "29.7", "lng": -95.3})).is_none());
        assert!(parse_location(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn present_fields_must_carry_a_value() {
        let mut errors = FieldErrors::default();
        let absent: Option<Status> = errors.parse_present("status", None);
        assert!(absent.is_none());
        assert!(errors.is_empty());

        let set: Option<Status> = errors.parse_present("status", Some(Some("resolved")));
        assert_eq!(set, Some(Status::Resolved));
        assert!(errors.is_empty());

        let null: Option<Status> = errors.parse_present("status", Some(None));
        let empty: Option<Priority> = errors.parse_present("priority", Some(Some("")));
        assert!(null.is_none() && empty.is_none());
        match errors.into_result() {
            Err(ServiceError::Validation(fields)) => {
                assert_eq!(fields.keys().collect::<Vec<_>>(), ["priority", "status"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
