//! Schema bootstrap.
//!
//! # Usage
//!
//! ```bash
//! storehouse bootstrap
//! ```
//!
//! Creates every managed table and index that is missing. Safe to run
//! against an initialised database.

use storehouse_server::db::bootstrap::bootstrap;

use super::{CommandError, connect};

/// Create the managed tables and indexes.
///
/// # Errors
///
/// Returns `CommandError` if the configuration is invalid or any DDL fails.
pub async fn run() -> Result<(), CommandError> {
    let (_, db) = connect().await?;
    bootstrap(&db).await?;
    tracing::info!("Schema is up to date");
    Ok(())
}
