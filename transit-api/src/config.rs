//! Backend configuration
//!
//! Read from environment variables once at startup. Empty variables are
//! treated as unset.

use std::fmt;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_NAME: &str = "transit.db";
const DEFAULT_APP_URL: &str = "http://localhost:8080";

/// `DB_NAME` value selecting the in-memory stores
pub const IN_MEMORY_DB: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Where user and transit data live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    Sqlite(String),
}

/// Origins allowed to call the API from a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    Any,
    List(Vec<String>),
}

impl CorsOrigin {
    fn parse(value: &str) -> Self {
        if value.trim() == "*" {
            return CorsOrigin::Any;
        }
        let origins: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if origins.is_empty() {
            CorsOrigin::Any
        } else {
            CorsOrigin::List(origins)
        }
    }
}

#[derive(Clone)]
pub struct Config {
    /// Port to listen on (`PORT`)
    pub port: u16,

    /// SQLite file or in-memory stores (`DB_NAME`)
    pub database: DatabaseTarget,

    /// Shared secret the Auth0 action presents as a bearer token (`BACKEND_API_TOKEN`)
    pub api_token: String,

    /// Public base URL of this backend (`APP_URL`)
    pub app_url: String,

    /// Allowed browser origins (`CORS_ORIGIN`)
    pub cors_origin: CorsOrigin,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let database = match get("DB_NAME").as_deref() {
            Some(IN_MEMORY_DB) => DatabaseTarget::Memory,
            Some(path) => DatabaseTarget::Sqlite(path.to_string()),
            None => DatabaseTarget::Sqlite(DEFAULT_DB_NAME.to_string()),
        };

        let api_token = get("BACKEND_API_TOKEN").ok_or(ConfigError::Missing("BACKEND_API_TOKEN"))?;

        let app_url = get("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string());

        let cors_origin = get("CORS_ORIGIN")
            .map(|value| CorsOrigin::parse(&value))
            .unwrap_or(CorsOrigin::Any);

        Ok(Self {
            port,
            database,
            api_token,
            app_url,
            cors_origin,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database", &self.database)
            .field("api_token", &"<redacted>")
            .field("app_url", &self.app_url)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}
