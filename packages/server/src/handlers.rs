//! HTTP handler functions for the flood watch API.

use actix_web::{HttpResponse, web};
use flood_watch_database::users;
use flood_watch_server_models::{
    ApiHealth, IncidentListParams, IncidentResponse, LoginRequest, LoginResponse,
    MessageResponse, RegisterRequest, RegisterResponse, ReportIncidentRequest, RescueStepRequest,
    RiskQueryParams, RiskResponse, UpdateIncidentRequest, UpdateRescueStepRequest, UserSummary,
    UsersQueryParams, UsersResponse,
};
use flood_watch_user_models::Role;
use flood_watch_zones::{RiskClassifier, ZoneError, download::download_zones, store};

use crate::{AppState, auth::AuthenticatedUser, error::ApiError};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// --- Auth ---

/// `POST /api/auth/register`
///
/// Role defaults to `responder` when omitted.
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let role = match body.role.as_deref().filter(|r| !r.is_empty()) {
        Some(role) => role
            .parse::<Role>()
            .map_err(|_| ApiError::invalid_field("role", format!("'{role}' is not a valid role")))?,
        None => Role::default(),
    };

    let user = state
        .auth
        .register(
            body.username.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
            role,
        )
        .await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user: UserSummary::from(&user),
    }))
}

/// `POST /api/auth/login`
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let (token, user) = state
        .auth
        .login(
            body.username.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

/// `GET /api/users`
///
/// Lists accounts, optionally for one role, so clients can pick a
/// commander to assign.
pub async fn list_users(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    params: web::Query<UsersQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let role = match params.role.as_deref().filter(|r| !r.is_empty()) {
        Some(role) => Some(
            role.parse::<Role>()
                .map_err(|_| ApiError::invalid_field("role", format!("'{role}' is not a valid role")))?,
        ),
        None => None,
    };

    let users = users::list_users(state.db.as_ref(), role).await?;

    Ok(HttpResponse::Ok().json(UsersResponse {
        users: users.iter().map(flood_watch_user_models::User::to_ref).collect(),
    }))
}

// --- Incidents ---

/// `POST /api/incidents`
pub async fn report_incident(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: web::Json<ReportIncidentRequest>,
) -> Result<HttpResponse, ApiError> {
    let incident = state.incidents.report(&claims, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(IncidentResponse {
        message: "Incident reported successfully".to_string(),
        incident,
    }))
}

/// `GET /api/incidents`
///
/// Filtered, sorted, paginated incident list.
pub async fn list_incidents(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    params: web::Query<IncidentListParams>,
) -> Result<HttpResponse, ApiError> {
    let page = state.incidents.list(&claims, &params).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// `GET /api/incidents/{id}`
pub async fn get_incident(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let incident = state.incidents.get(&claims, &path).await?;
    Ok(HttpResponse::Ok().json(incident))
}

/// `PUT /api/incidents/{id}`
pub async fn update_incident(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<UpdateIncidentRequest>,
) -> Result<HttpResponse, ApiError> {
    let incident = state
        .incidents
        .update(&claims, &path, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(IncidentResponse {
        message: "Incident updated successfully".to_string(),
        incident,
    }))
}

/// `DELETE /api/incidents/{id}`
pub async fn delete_incident(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state.incidents.delete(&claims, &path).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Incident deleted successfully")))
}

/// `POST /api/incidents/{id}/rescue-steps`
pub async fn add_rescue_step(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<RescueStepRequest>,
) -> Result<HttpResponse, ApiError> {
    let incident = state
        .incidents
        .add_rescue_step(&claims, &path, body.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(IncidentResponse {
        message: "Rescue step added".to_string(),
        incident,
    }))
}

/// `PUT /api/incidents/{id}/rescue-steps/{stepNumber}`
pub async fn update_rescue_step(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateRescueStepRequest>,
) -> Result<HttpResponse, ApiError> {
    let (id, step_number) = path.into_inner();
    let incident = state
        .incidents
        .update_rescue_step(&claims, &id, &step_number, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(IncidentResponse {
        message: "Rescue step updated".to_string(),
        incident,
    }))
}

// --- GIS ---

/// `GET /api/gis/risk?lat=..&lng=..`
///
/// Returns the flood risk of the first zone containing the point, or
/// `"None"`.
pub async fn check_risk(
    state: web::Data<AppState>,
    params: web::Query<RiskQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let lat = parse_coordinate("lat", params.lat.as_deref(), 90.0)?;
    let lng = parse_coordinate("lng", params.lng.as_deref(), 180.0)?;

    let zones = state
        .zones
        .load()
        .await
        .map_err(|e| ApiError::internal("Could not load GIS data", &e))?;
    let classifier = RiskClassifier::new(&zones);

    Ok(HttpResponse::Ok().json(RiskResponse {
        risk: classifier.classify(lat, lng).to_string(),
    }))
}

fn parse_coordinate(field: &str, value: Option<&str>, limit: f64) -> Result<f64, ApiError> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
        ApiError::invalid_field(field, format!("{field} is required"))
    })?;

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && n.abs() <= limit => Ok(n),
        _ => Err(ApiError::invalid_field(
            field,
            format!("{field} must be a number between -{limit} and {limit}"),
        )),
    }
}

/// `POST /api/gis/flood-zones`
///
/// Replaces the stored zones wholesale.
pub async fn update_flood_zones(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(ApiError::BadRequest(
            "No GeoJSON data provided in the request body.".to_string(),
        ));
    }

    let zones = store::parse_feature_collection(&body.to_string())
        .map_err(|e| ApiError::BadRequest(format!("Invalid flood zone data: {e}")))?;

    state
        .zones
        .save(&zones)
        .await
        .map_err(|e| ApiError::internal("Could not update flood zones data.", &e))?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Flood zones data updated successfully.",
    )))
}

/// `GET /api/gis/flood-zones` and `GET /api/flood/zones`
///
/// Returns the stored document as-is. A blank file reads as an empty
/// `FeatureCollection`.
pub async fn get_flood_zones(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    match state.zones.load_raw().await {
        Ok(zones) => Ok(HttpResponse::Ok().json(zones)),
        Err(ZoneError::NotFound { .. }) => Err(ApiError::NotFound(
            "Flood zones data not found. Please upload data first.".to_string(),
        )),
        Err(e @ ZoneError::Json(_)) => Err(ApiError::internal(
            "Flood data is corrupted or not valid JSON.",
            &e,
        )),
        Err(e) => Err(ApiError::internal("Could not read flood data", &e)),
    }
}

// --- Flood data ---

/// `GET /api/flood/download-flood-data`
///
/// Fetches the public flood zone dataset and stores it.
pub async fn download_flood_data(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let count = download_zones(&state.http, &state.flood_data_url, &state.zones)
        .await
        .map_err(|e| ApiError::internal("Failed to download flood data", &e))?;

    log::info!("Downloaded {count} flood zones");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Flood data saved successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_are_parsed_strictly() {
        assert!((parse_coordinate("lat", Some(" 29.76 "), 90.0).unwrap() - 29.76).abs() < 1e-9);
        assert!(parse_coordinate("lat", None, 90.0).is_err());
        assert!(parse_coordinate("lat", Some(""), 90.0).is_err());
        assert!(parse_coordinate("lat", Some("north"), 90.0).is_err());
        assert!(parse_coordinate("lat", Some("NaN"), 90.0).is_err());
        assert!(parse_coordinate("lat", Some("91"), 90.0).is_err());
        assert!(parse_coordinate("lng", Some("-180"), 180.0).is_ok());
    }
}
