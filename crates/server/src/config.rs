//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREHOUSE_DB_DRIVER` - `mysql`, `postgres`, or `sqlite3`
//! - `STOREHOUSE_DATABASE_URL` - connection string for that driver (falls
//!   back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREHOUSE_DEBUG` - verbose logging (default: false)
//! - `STOREHOUSE_HOST` - bind address (default: 127.0.0.1)
//! - `STOREHOUSE_PORT` - listen port (default: 8080)
//! - `STOREHOUSE_SESSION_WINDOW_MINUTES` - sliding session expiry (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::db::Dialect;

pub const DEFAULT_SESSION_WINDOW_MINUTES: i64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub debug: bool,
    pub host: IpAddr,
    pub port: u16,
    pub dialect: Dialect,
    /// Connection string (may contain a password)
    pub database_url: SecretString,
    pub session_window_minutes: i64,
    pub sentry_dsn: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&get);

        let dialect = env
            .required("STOREHOUSE_DB_DRIVER")?
            .parse::<Dialect>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREHOUSE_DB_DRIVER".to_owned(), e.to_string())
            })?;
        let database_url = env
            .get("STOREHOUSE_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREHOUSE_DATABASE_URL".to_owned()))?;
        if !url_matches_dialect(database_url.expose_secret(), dialect) {
            return Err(ConfigError::InvalidEnvVar(
                "STOREHOUSE_DATABASE_URL".to_owned(),
                format!("scheme does not match driver {dialect}"),
            ));
        }

        Ok(Self {
            debug: env.parse_or("STOREHOUSE_DEBUG", false)?,
            host: env.parse_or("STOREHOUSE_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: env.parse_or("STOREHOUSE_PORT", 8080)?,
            dialect,
            database_url,
            session_window_minutes: env
                .parse_or("STOREHOUSE_SESSION_WINDOW_MINUTES", DEFAULT_SESSION_WINDOW_MINUTES)?,
            sentry_dsn: env.get("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn url_matches_dialect(url: &str, dialect: Dialect) -> bool {
    let scheme = url.split(':').next().unwrap_or_default();
    match dialect {
        Dialect::Postgres => matches!(scheme, "postgres" | "postgresql"),
        Dialect::MySql => matches!(scheme, "mysql" | "mariadb"),
        Dialect::Sqlite => scheme == "sqlite",
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
    }

    /// Parse a variable, using `default` when it is unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
        })
    }
}
