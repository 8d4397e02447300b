//! Idempotent schema creation.
//!
//! Every managed table gets the base columns, its own columns, an index on
//! `deleted_at`, and any table-specific indexes. Running this against an
//! initialised database changes nothing.

use tracing::{debug, info};

use super::dialect::{ColumnType, Dialect};
use super::{Db, Params, RepositoryError};

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn column(name: &'static str, ty: ColumnType) -> ColumnSpec {
    ColumnSpec { name, ty }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl IndexSpec {
    /// `idx_<table>_<cols>`, or `uidx_...` for unique indexes.
    #[must_use]
    pub fn name(&self, table: &str) -> String {
        let prefix = if self.unique { "uidx" } else { "idx" };
        format!("{prefix}_{table}_{}", self.columns.join("_"))
    }
}

const SOFT_DELETE_INDEX: IndexSpec = IndexSpec {
    columns: &["deleted_at"],
    unique: false,
};

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub indexes: &'static [IndexSpec],
}

/// Managed tables, in creation order.
pub const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "audit_log",
        columns: &[
            column("type", ColumnType::Integer),
            column("resource_type", ColumnType::Integer),
            column("resource_id", ColumnType::Integer),
            column("executor_id", ColumnType::Integer),
        ],
        indexes: &[IndexSpec {
            columns: &["resource_type", "resource_id"],
            unique: false,
        }],
    },
    TableSpec {
        name: "sessions",
        columns: &[
            column("account_id", ColumnType::Integer),
            column("token", ColumnType::IndexedText),
        ],
        indexes: &[
            IndexSpec {
                columns: &["updated_at", "token"],
                unique: false,
            },
            IndexSpec {
                columns: &["token"],
                unique: true,
            },
        ],
    },
    TableSpec {
        name: "accounts",
        columns: &[
            column("type", ColumnType::Integer),
            column("email", ColumnType::IndexedText),
            column("password_digest", ColumnType::Text),
            column("name", ColumnType::Text),
            column("surname", ColumnType::Text),
        ],
        indexes: &[IndexSpec {
            columns: &["email"],
            unique: true,
        }],
    },
    TableSpec {
        name: "products",
        columns: &[
            column("status", ColumnType::Integer),
            column("name", ColumnType::Text),
            column("description", ColumnType::Text),
            column("price", ColumnType::Float),
            column("images", ColumnType::Text),
        ],
        indexes: &[],
    },
    TableSpec {
        name: "orders",
        columns: &[
            column("status", ColumnType::Integer),
            column("order_by", ColumnType::Integer),
            column("shipping_address", ColumnType::Text),
            column("invoice_address", ColumnType::Text),
            column("products", ColumnType::Text),
            column("shipping_price", ColumnType::Float),
            column("total", ColumnType::Float),
        ],
        indexes: &[IndexSpec {
            columns: &["order_by"],
            unique: false,
        }],
    },
];

impl TableSpec {
    /// `CREATE TABLE IF NOT EXISTS` for this table.
    #[must_use]
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let timestamp = dialect.column_type(ColumnType::Timestamp);
        let mut columns = vec![
            format!("id {}", dialect.primary_key()),
            format!("created_at {timestamp} NOT NULL DEFAULT CURRENT_TIMESTAMP"),
            format!("updated_at {timestamp} NOT NULL DEFAULT CURRENT_TIMESTAMP"),
            format!("deleted_at {timestamp} NULL"),
        ];
        columns.extend(
            self.columns
                .iter()
                .map(|c| format!("{} {} NOT NULL", c.name, dialect.column_type(c.ty))),
        );
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            columns.join(", ")
        )
    }

    /// All indexes, the soft-delete index first.
    pub fn all_indexes(&self) -> impl Iterator<Item = &IndexSpec> {
        std::iter::once(&SOFT_DELETE_INDEX).chain(self.indexes.iter())
    }

    #[must_use]
    pub fn create_index_sql(&self, index: &IndexSpec, dialect: Dialect) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let guard = if dialect.supports_index_if_not_exists() {
            "IF NOT EXISTS "
        } else {
            ""
        };
        format!(
            "CREATE {unique}INDEX {guard}{} ON {} ({})",
            index.name(self.name),
            self.name,
            index.columns.join(", ")
        )
    }
}

/// Create every managed table and index that does not exist yet.
///
/// # Errors
///
/// Returns the translated storage error; startup treats it as fatal.
pub async fn bootstrap(db: &Db) -> Result<(), RepositoryError> {
    let dialect = db.dialect();
    for table in TABLES {
        let sql = table.create_sql(dialect);
        debug!(table = table.name, %sql, "ensuring table");
        sqlx::query(&sql).execute(db.pool()).await?;

        for index in table.all_indexes() {
            let name = index.name(table.name);
            if !dialect.supports_index_if_not_exists()
                && index_exists(db, table.name, &name).await?
            {
                debug!(index = %name, "index already present");
                continue;
            }
            let sql = table.create_index_sql(index, dialect);
            debug!(index = %name, %sql, "ensuring index");
            sqlx::query(&sql).execute(db.pool()).await?;
        }
    }
    info!(dialect = %dialect, tables = TABLES.len(), "schema bootstrap complete");
    Ok(())
}

async fn index_exists(db: &Db, table: &'static str, index: &str) -> Result<bool, RepositoryError> {
    let lookup = db.statements().raw(
        "SELECT COUNT(1) FROM INFORMATION_SCHEMA.STATISTICS \
         WHERE table_schema = DATABASE() AND table_name = :table AND index_name = :index",
    );
    let params = Params::new().with("table", table).with("index", index);
    Ok(db.fetch_scalar(&lookup, &params).await? > 0)
}
