//! Staff account provisioning.
//!
//! # Usage
//!
//! ```bash
//! storehouse staff create -e ops@example.com -n Ada -s Lovelace -p 'Str0ng!pass'
//! ```
//!
//! The account is created with the staff level and audited with the system
//! executor (id 0). The schema is bootstrapped first, so this works against
//! an empty database.

use std::sync::Arc;

use storehouse_core::AccountId;
use storehouse_server::db::bootstrap::bootstrap;
use storehouse_server::services::{Argon2Hasher, Services};

use super::{CommandError, connect};

/// Create a staff account.
///
/// # Errors
///
/// Returns `CommandError` for an invalid email or weak password, a taken
/// email, or a database failure.
pub async fn create(
    email: &str,
    password: &str,
    name: String,
    surname: String,
) -> Result<AccountId, CommandError> {
    let (config, db) = connect().await?;
    bootstrap(&db).await?;
    let services = Services::new(db, Arc::new(Argon2Hasher), config.session_window_minutes).await?;

    let account = services
        .accounts
        .create_staff(email, password, name, surname)
        .await?;

    tracing::info!(
        "Staff account created successfully! ID: {}, Email: {}",
        account.id(),
        account.email
    );
    Ok(account.id())
}
