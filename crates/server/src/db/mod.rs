//! Relational data access over `MySQL`, `PostgreSQL`, or `SQLite`.
//!
//! # Tables
//!
//! - `accounts` - users and staff; email unique among live rows
//! - `sessions` - opaque bearer tokens with sliding expiry
//! - `orders` - orders with line items in a delimited array column
//! - `products` - catalogue entries with image references
//! - `audit_log` - append-only record of every mutation
//!
//! Every table carries `id`, `created_at`, `updated_at`, and `deleted_at`.
//! Rows are never physically removed; selects only see `deleted_at IS NULL`.
//!
//! # Schema
//!
//! Tables and indexes are created idempotently at startup by
//! [`bootstrap::bootstrap`], or explicitly with:
//! ```bash
//! cargo run -p storehouse-cli -- bootstrap
//! ```

pub mod accounts;
pub mod audit;
pub mod bootstrap;
pub mod codec;
pub mod dialect;
pub mod orders;
pub mod products;
pub mod schema;
pub mod sessions;
pub mod statement;

use std::panic::Location;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyConnection, AnyPool, Executor, Transaction};
use thiserror::Error;
use tracing::{debug, warn};

pub use accounts::AccountRepository;
pub use audit::AuditRepository;
pub use dialect::Dialect;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use schema::Record;
pub use sessions::SessionRepository;
pub use statement::{Params, Statement, StatementBuilder, Value};

/// Errors from database operations, translated once at this boundary.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No matching live row.
    #[error("not found")]
    NotFound,

    /// A unique constraint rejected the write.
    #[error("duplicate value violates a unique constraint")]
    Duplicate,

    /// A not-null constraint rejected the write.
    #[error("missing value violates a not-null constraint")]
    NullConstraint,

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A statement was executed without a value for one of its placeholders.
    #[error("statement parameter :{0} was not provided")]
    MissingParameter(String),

    /// Any other storage failure, with the line that issued it.
    #[error("{message} (at {caller})")]
    Fatal {
        message: &'static str,
        caller: &'static Location<'static>,
        #[source]
        source: sqlx::Error,
    },
}

const UNIQUE_CODES: &[&str] = &["23505", "2067", "1555"];
const NOT_NULL_CODES: &[&str] = &["23502", "1299"];
const MYSQL_UNIQUE_NUMBERS: &[u16] = &[1062, 1586];
const MYSQL_NOT_NULL_NUMBERS: &[u16] = &[1048];

impl From<sqlx::Error> for RepositoryError {
    #[track_caller]
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        if let sqlx::Error::Database(ref db_err) = error {
            let code = db_err.code();
            let code = code.as_deref();
            let mysql_number = db_err
                .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                .map(sqlx::mysql::MySqlDatabaseError::number);

            if code.is_some_and(|c| UNIQUE_CODES.contains(&c))
                || mysql_number.is_some_and(|n| MYSQL_UNIQUE_NUMBERS.contains(&n))
            {
                return Self::Duplicate;
            }
            if code.is_some_and(|c| NOT_NULL_CODES.contains(&c))
                || mysql_number.is_some_and(|n| MYSQL_NOT_NULL_NUMBERS.contains(&n))
            {
                return Self::NullConstraint;
            }
            match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => return Self::Duplicate,
                sqlx::error::ErrorKind::NotNullViolation => return Self::NullConstraint,
                _ => {}
            }
        }

        Self::Fatal {
            message: "database operation failed",
            caller: Location::caller(),
            source: error,
        }
    }
}

impl RepositoryError {
    /// Whether this error means the data layer itself is broken.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Fatal { .. } | Self::DataCorruption(_) | Self::MissingParameter(_)
        )
    }
}

/// Create a connection pool for any of the supported drivers.
///
/// # Arguments
///
/// * `database_url` - connection string (wrapped in `SecretString`); its
///   scheme selects the driver
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Single-connection pool over a private in-memory `SQLite` database.
///
/// The connection is never recycled, since closing it would drop the data.
///
/// # Errors
///
/// Returns `sqlx::Error` if `SQLite` cannot be opened.
pub async fn create_memory_pool() -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// In-memory `SQLite` database with the managed schema already created.
///
/// # Errors
///
/// Returns the translated storage error.
pub async fn open_in_memory() -> Result<Db, RepositoryError> {
    let db = Db::new(create_memory_pool().await?, Dialect::Sqlite);
    bootstrap::bootstrap(&db).await?;
    Ok(db)
}

/// `NotFound` when a write touched no live row.
pub(crate) const fn affected(rows: u64) -> Result<u64, RepositoryError> {
    if rows == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(rows)
    }
}

/// Process-wide database handle: the pool plus the configured dialect.
#[derive(Debug, Clone)]
pub struct Db {
    pool: AnyPool,
    dialect: Dialect,
}

impl Db {
    #[must_use]
    pub const fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub const fn statements(&self) -> StatementBuilder {
        StatementBuilder::new(self.dialect)
    }

    /// Validate a statement against the server.
    ///
    /// Run once per statement at startup; a failure means the process must not
    /// serve traffic.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn prepare(&self, statement: Statement) -> Result<Statement, RepositoryError> {
        debug!(sql = statement.sql(), "preparing statement");
        (&self.pool).prepare(statement.sql()).await?;
        Ok(statement)
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn execute(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<u64, RepositoryError> {
        statement.execute(&self.pool, params).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error (`RepositoryError::NotFound` for no row).
    pub async fn fetch_one<R: Record>(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<R, RepositoryError> {
        R::from_row(&statement.fetch_one(&self.pool, params).await?)
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch_optional<R: Record>(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<Option<R>, RepositoryError> {
        statement
            .fetch_optional(&self.pool, params)
            .await?
            .as_ref()
            .map(R::from_row)
            .transpose()
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch_all<R: Record>(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<Vec<R>, RepositoryError> {
        statement
            .fetch_all(&self.pool, params)
            .await?
            .iter()
            .map(R::from_row)
            .collect()
    }

    /// Fetch the first column of exactly one row as an integer.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch_scalar(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<i64, RepositoryError> {
        let row = statement.fetch_one(&self.pool, params).await?;
        sqlx::Row::try_get::<i64, _>(&row, 0)
            .map_err(|e| RepositoryError::DataCorruption(format!("scalar column: {e}")))
    }

    /// Run an insert and return the generated id.
    ///
    /// Dialects with `RETURNING` read the id from the inserted row; `MySQL`
    /// runs the insert in a transaction and reads the last-insert id.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn insert_returning_id(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<i64, RepositoryError> {
        if self.dialect.returns_inserted_id() {
            return self.fetch_scalar(statement, params).await;
        }
        let mut tx = self.begin().await?;
        let outcome = insert_id(tx.conn(), statement, params).await;
        tx.finish(outcome).await
    }

    /// Start a unit of work. Finish it with [`Tx::finish`].
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn begin(&self) -> Result<Tx, RepositoryError> {
        Ok(Tx {
            inner: self.pool.begin().await?,
        })
    }

    /// Liveness probe (`SELECT 1`).
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

async fn insert_id(
    conn: &mut AnyConnection,
    statement: &Statement,
    params: &Params,
) -> Result<i64, RepositoryError> {
    let result = statement.run(conn, params).await?;
    result
        .last_insert_id()
        .ok_or_else(|| RepositoryError::DataCorruption("driver reported no insert id".to_owned()))
}

/// Transaction coordinator.
///
/// Statements run against [`conn`](Self::conn); [`finish`](Self::finish)
/// commits on success and rolls back on failure, returning the original error.
/// Dropping a `Tx` without finishing it rolls back.
pub struct Tx {
    inner: Transaction<'static, Any>,
}

impl Tx {
    pub fn conn(&mut self) -> &mut AnyConnection {
        &mut self.inner
    }

    /// # Errors
    ///
    /// Returns `outcome`'s error after rolling back, or the commit error.
    pub async fn finish<T>(
        self,
        outcome: Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        match outcome {
            Ok(value) => {
                self.inner.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = self.inner.rollback().await {
                    warn!(error = %rollback, "transaction rollback failed");
                }
                Err(error)
            }
        }
    }
}
