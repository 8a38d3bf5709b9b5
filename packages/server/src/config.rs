//! Startup configuration.
//!
//! Read once from the environment (after `.env` is loaded) and handed to
//! [`AppState`](crate::AppState); nothing reads the environment afterwards.

use std::path::PathBuf;

use flood_watch_auth::{
    password::{DEFAULT_COST, MAX_COST, MIN_COST},
    token::DEFAULT_TTL_HOURS,
};

/// Default public flood zone dataset.
pub const DEFAULT_FLOOD_DATA_URL: &str =
    "https://opendata.arcgis.com/datasets/9c580a2d1e0f47a8a1d67170f82f23d2_0.geojson";

/// Longest accepted token lifetime (one year).
const MAX_TTL_HOURS: i64 = 8760;

/// Default location of the flood zone file.
pub const DEFAULT_FLOOD_ZONES_PATH: &str = "data/flood_zones.geojson";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET is not defined in the environment variables")]
    MissingJwtSecret,

    #[error("Invalid value for {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub bind_addr: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub flood_zones_path: PathBuf,
    pub flood_data_url: String,
    pub bcrypt_cost: u32,
    pub token_ttl_hours: i64,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `JWT_SECRET` is unset or a numeric
    /// setting does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::MissingJwtSecret)?;

        let port = match var("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: v,
                reason: "expected a port number",
            })?,
            None => 5000,
        };

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(v) => match v.parse::<u32>() {
                Ok(cost) if (MIN_COST..=MAX_COST).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "BCRYPT_COST",
                        value: v,
                        reason: "expected an integer from 4 to 31",
                    });
                }
            },
            None => DEFAULT_COST,
        };

        let token_ttl_hours = match var("TOKEN_TTL_HOURS") {
            Some(v) => match v.parse::<i64>() {
                Ok(hours) if (1..=MAX_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_HOURS",
                        value: v,
                        reason: "expected 1 to 8760 hours",
                    });
                }
            },
            None => DEFAULT_TTL_HOURS,
        };

        Ok(Self {
            jwt_secret,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_path: var("DATABASE_PATH")
                .unwrap_or_else(|| flood_watch_database::DEFAULT_DB_PATH.to_string())
                .into(),
            flood_zones_path: var("FLOOD_ZONES_PATH")
                .unwrap_or_else(|| DEFAULT_FLOOD_ZONES_PATH.to_string())
                .into(),
            flood_data_url: var("FLOOD_DATA_URL")
                .unwrap_or_else(|| DEFAULT_FLOOD_DATA_URL.to_string()),
            bcrypt_cost,
            token_ttl_hours,
        })
    }
}
