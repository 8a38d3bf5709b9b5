#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for flood watch.
//!
//! Serves the REST API for reporting and managing flood incidents, user
//! registration and login, and flood-risk lookups against the stored
//! zone file. Protected routes expect an `Authorization: Bearer <token>`
//! header.

mod auth;
pub mod config;
mod error;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, ResponseError, error::InternalError, middleware, web};
use flood_watch_auth::{AuthError, AuthService, TokenService};
use flood_watch_incident::service::IncidentService;
use flood_watch_zones::ZoneStore;
use switchy_database::Database;

use crate::{config::ServerConfig, error::ApiError};

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    pub auth: AuthService,
    pub incidents: IncidentService,
    /// Flood zone file.
    pub zones: ZoneStore,
    /// Client for flood data downloads.
    pub http: reqwest::Client,
    pub flood_data_url: String,
}

impl AppState {
    /// Wires the services around an open database.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hash`] if the configured bcrypt cost is
    /// rejected.
    pub fn new(db: Arc<dyn Database>, config: &ServerConfig) -> Result<Self, AuthError> {
        let tokens = TokenService::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.token_ttl_hours),
        );

        Ok(Self {
            auth: AuthService::new(db.clone(), tokens, config.bcrypt_cost)?,
            incidents: IncidentService::new(db.clone()),
            zones: ZoneStore::new(config.flood_zones_path.clone()),
            http: reqwest::Client::new(),
            flood_data_url: config.flood_data_url.clone(),
            db,
        })
    }
}

/// Registers extractor error handlers and every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid request body: {err}");
        InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid query string: {err}");
        InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid path: {err}");
        InternalError::from_response(err, ApiError::BadRequest(message).error_response()).into()
    }))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/auth/register", web::post().to(handlers::register))
            .route("/auth/login", web::post().to(handlers::login))
            .route("/users", web::get().to(handlers::list_users))
            .route("/incidents", web::get().to(handlers::list_incidents))
            .route("/incidents", web::post().to(handlers::report_incident))
            .route("/incidents/{id}", web::get().to(handlers::get_incident))
            .route("/incidents/{id}", web::put().to(handlers::update_incident))
            .route("/incidents/{id}", web::delete().to(handlers::delete_incident))
            .route(
                "/incidents/{id}/rescue-steps",
                web::post().to(handlers::add_rescue_step),
            )
            .route(
                "/incidents/{id}/rescue-steps/{step_number}",
                web::put().to(handlers::update_rescue_step),
            )
            .route("/gis/risk", web::get().to(handlers::check_risk))
            .route("/gis/flood-zones", web::get().to(handlers::get_flood_zones))
            .route("/gis/flood-zones", web::post().to(handlers::update_flood_zones))
            .route("/flood/zones", web::get().to(handlers::get_flood_zones))
            .route(
                "/flood/download-flood-data",
                web::get().to(handlers::download_flood_data),
            ),
    );
}

/// Opens the database, builds the services, and serves until shutdown.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the services
/// cannot be built, or the server fails to bind.
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Opening database at {}", config.database_path.display());
    let db = flood_watch_database::open_db(&config.database_path)
        .await
        .map_err(std::io::Error::other)?;

    let state = web::Data::new(
        AppState::new(Arc::from(db), &config).map_err(std::io::Error::other)?,
    );

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.clone(), config.port))?
    .run()
    .await
}
