//! Subcommand implementations.

pub mod bootstrap;
pub mod staff;

use storehouse_server::config::{ConfigError, ServerConfig};
use storehouse_server::db::{self, Db, RepositoryError};
use storehouse_server::services::ServiceError;
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

/// Load the configuration and connect with its dialect.
async fn connect() -> Result<(ServerConfig, Db), CommandError> {
    let config = ServerConfig::from_env()?;
    tracing::info!(dialect = %config.dialect, "Connecting to database...");
    let pool = db::create_pool(&config.database_url)
        .await
        .map_err(RepositoryError::from)?;
    let db = Db::new(pool, config.dialect);
    Ok((config, db))
}
