//! Statement text, named parameters, and the statement builder.
//!
//! Statements are written against `:name` placeholders and rewritten once, at
//! construction, into the dialect's positional form. Executing a statement
//! binds values from a [`Params`] map in the recorded order.

use sqlx::any::{Any, AnyArguments, AnyQueryResult, AnyRow};
use sqlx::query::Query;
use sqlx::Executor;

use super::RepositoryError;
use super::dialect::Dialect;
use super::schema::Record;

/// A bindable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

macro_rules! value_from_code {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::Int(i64::from(v))
            }
        })+
    };
}

value_from_code!(
    storehouse_core::AccountId,
    storehouse_core::SessionId,
    storehouse_core::OrderId,
    storehouse_core::ProductId,
    storehouse_core::AuthLevel,
    storehouse_core::OrderStatus,
    storehouse_core::ProductStatus,
    storehouse_core::EntryKind,
    storehouse_core::ResourceKind
);

/// Ordered name to value map for one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(&'static str, Value)>);

impl Params {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add or replace a value, builder style.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// `:limit` and `:offset` for a 1-based page.
    #[must_use]
    pub fn page(limit: i64, page: i64) -> Self {
        Self::new()
            .with("limit", limit)
            .with("offset", limit.saturating_mul(page.max(1) - 1))
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(n, _)| *n)
    }
}

/// A statement rewritten for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<String>,
}

impl Statement {
    /// Rewrite `:name` placeholders in `sql` for `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect, sql: &str) -> Self {
        let (sql, params) = dialect.bind_named(sql);
        Self { sql, params }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names in binding order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    fn bind<'q>(
        &'q self,
        values: &Params,
    ) -> Result<Query<'q, Any, AnyArguments<'q>>, RepositoryError> {
        let mut query = sqlx::query(&self.sql);
        for name in &self.params {
            let value = values
                .get(name)
                .ok_or_else(|| RepositoryError::MissingParameter(name.clone()))?;
            query = match value {
                Value::Int(v) => query.bind(*v),
                Value::Float(v) => query.bind(*v),
                Value::Text(v) => query.bind(v.clone()),
            };
        }
        Ok(query)
    }

    /// Run the statement and return the driver's result.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn run<'c, E>(
        &self,
        executor: E,
        values: &Params,
    ) -> Result<AnyQueryResult, RepositoryError>
    where
        E: Executor<'c, Database = Any>,
    {
        Ok(self.bind(values)?.execute(executor).await?)
    }

    /// Run the statement and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn execute<'c, E>(&self, executor: E, values: &Params) -> Result<u64, RepositoryError>
    where
        E: Executor<'c, Database = Any>,
    {
        Ok(self.run(executor, values).await?.rows_affected())
    }

    /// Fetch exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no row matches.
    pub async fn fetch_one<'c, E>(
        &self,
        executor: E,
        values: &Params,
    ) -> Result<AnyRow, RepositoryError>
    where
        E: Executor<'c, Database = Any>,
    {
        Ok(self.bind(values)?.fetch_one(executor).await?)
    }

    /// Fetch at most one row.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch_optional<'c, E>(
        &self,
        executor: E,
        values: &Params,
    ) -> Result<Option<AnyRow>, RepositoryError>
    where
        E: Executor<'c, Database = Any>,
    {
        Ok(self.bind(values)?.fetch_optional(executor).await?)
    }

    /// Fetch every matching row.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch_all<'c, E>(
        &self,
        executor: E,
        values: &Params,
    ) -> Result<Vec<AnyRow>, RepositoryError>
    where
        E: Executor<'c, Database = Any>,
    {
        Ok(self.bind(values)?.fetch_all(executor).await?)
    }
}

/// Composes select/insert/update/soft-delete statements for one dialect.
///
/// Every select is restricted to live rows (`deleted_at IS NULL`) and every
/// update also stamps `updated_at`.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    dialect: Dialect,
}

impl StatementBuilder {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Free-form statement; the caller is responsible for soft-delete filtering.
    #[must_use]
    pub fn raw(&self, sql: &str) -> Statement {
        Statement::new(self.dialect, sql)
    }

    fn live(predicate: &str) -> String {
        if predicate.trim().is_empty() {
            "deleted_at IS NULL".to_owned()
        } else {
            format!("{predicate} AND deleted_at IS NULL")
        }
    }

    /// Full select list for `R`: base columns first, timestamps read as text.
    #[must_use]
    pub fn select_list<R: Record>(&self) -> String {
        let mut list = vec![
            "id".to_owned(),
            self.dialect.timestamp_as_text("created_at"),
            self.dialect.timestamp_as_text("updated_at"),
            self.dialect.timestamp_as_text("deleted_at"),
        ];
        list.extend(R::SCHEMA.columns().into_iter().map(str::to_owned));
        list.join(", ")
    }

    /// `SELECT <columns of R> FROM table WHERE predicate AND deleted_at IS NULL`.
    #[must_use]
    pub fn select<R: Record>(&self, table: &str, predicate: &str) -> Statement {
        self.select_with::<R>(table, predicate, "")
    }

    /// Like [`select`](Self::select) with a trailing clause (ordering, limits).
    #[must_use]
    pub fn select_with<R: Record>(&self, table: &str, predicate: &str, tail: &str) -> Statement {
        let mut sql = format!(
            "SELECT {} FROM {table} WHERE {}",
            self.select_list::<R>(),
            Self::live(predicate)
        );
        if !tail.is_empty() {
            sql.push(' ');
            sql.push_str(tail);
        }
        self.raw(&sql)
    }

    /// Newest first, `:limit` rows after skipping `:offset`.
    #[must_use]
    pub fn select_page<R: Record>(&self, table: &str, predicate: &str) -> Statement {
        self.select_with::<R>(table, predicate, "ORDER BY id DESC LIMIT :limit OFFSET :offset")
    }

    /// Select a single expression from live rows.
    #[must_use]
    pub fn select_expr(&self, table: &str, expr: &str, predicate: &str) -> Statement {
        self.raw(&format!(
            "SELECT {expr} FROM {table} WHERE {}",
            Self::live(predicate)
        ))
    }

    /// Insert every persisted column of `R`, bound by column name.
    #[must_use]
    pub fn insert_from_record<R: Record>(&self, table: &str) -> Statement {
        let columns = R::SCHEMA.columns();
        let mut sql = format!(
            "INSERT INTO {table} ({}) VALUES (:{})",
            columns.join(", "),
            columns.join(", :")
        );
        if self.dialect.returns_inserted_id() {
            sql.push_str(" RETURNING id");
        }
        self.raw(&sql)
    }

    /// `UPDATE table SET set_clause, updated_at = now WHERE predicate`.
    #[must_use]
    pub fn update(&self, table: &str, set_clause: &str, predicate: &str) -> Statement {
        let stamp = format!("updated_at = {}", self.dialect.now());
        let set = if set_clause.trim().is_empty() {
            stamp
        } else {
            format!("{set_clause}, {stamp}")
        };
        self.raw(&format!(
            "UPDATE {table} SET {set} WHERE {}",
            Self::live(predicate)
        ))
    }

    /// Update every persisted column of `R` from its record values.
    #[must_use]
    pub fn update_from_record<R: Record>(&self, table: &str, predicate: &str) -> Statement {
        let set: Vec<String> = R::SCHEMA
            .columns()
            .into_iter()
            .map(|c| format!("{c} = :{c}"))
            .collect();
        self.update(table, &set.join(", "), predicate)
    }

    /// `UPDATE table SET deleted_at = now WHERE predicate`.
    #[must_use]
    pub fn soft_delete(&self, table: &str, predicate: &str) -> Statement {
        self.raw(&format!(
            "UPDATE {table} SET deleted_at = {} WHERE {}",
            self.dialect.now(),
            Self::live(predicate)
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::session::Session;

    #[test]
    fn test_params_replace_keeps_position() {
        let mut params = Params::new().with("a", 1).with("b", "x");
        params.set("a", 2.5);
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&Value::Float(2.5)));
        assert_eq!(params.get("c"), None);
    }

    #[test]
    fn test_page_offsets() {
        assert_eq!(Params::page(10, 3).get("offset"), Some(&Value::Int(20)));
        assert_eq!(Params::page(10, 0).get("offset"), Some(&Value::Int(0)));
        assert_eq!(Params::page(0, 5).get("limit"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_select_appends_soft_delete_filter() {
        let stmt =
            StatementBuilder::new(Dialect::Sqlite).select::<Session>("sessions", "token = :token");
        assert_eq!(
            stmt.sql(),
            "SELECT id, CAST(created_at AS TEXT) AS created_at, \
             CAST(updated_at AS TEXT) AS updated_at, \
             CAST(deleted_at AS TEXT) AS deleted_at, account_id, token FROM sessions \
             WHERE token = ? AND deleted_at IS NULL"
        );
        assert_eq!(stmt.params(), ["token"]);
    }

    #[test]
    fn test_select_without_predicate() {
        let stmt = StatementBuilder::new(Dialect::MySql).select_expr("orders", "COUNT(*)", "");
        assert_eq!(stmt.sql(), "SELECT COUNT(*) FROM orders WHERE deleted_at IS NULL");
    }

    #[test]
    fn test_postgres_select_reads_timestamps_as_text() {
        let stmt =
            StatementBuilder::new(Dialect::Postgres).select::<Session>("sessions", "id = :id");
        assert!(stmt.sql().starts_with(
            "SELECT id, CAST(created_at AS TEXT) AS created_at, \
             CAST(updated_at AS TEXT) AS updated_at"
        ));
        assert!(stmt.sql().ends_with("WHERE id = $1 AND deleted_at IS NULL"));
    }

    #[test]
    fn test_insert_strategy_per_dialect() {
        let pg = StatementBuilder::new(Dialect::Postgres).insert_from_record::<Session>("sessions");
        assert_eq!(
            pg.sql(),
            "INSERT INTO sessions (account_id, token) VALUES ($1, $2) RETURNING id"
        );
        let my = StatementBuilder::new(Dialect::MySql).insert_from_record::<Session>("sessions");
        assert_eq!(my.sql(), "INSERT INTO sessions (account_id, token) VALUES (?, ?)");
        assert_eq!(my.params(), ["account_id", "token"]);
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let stmt = StatementBuilder::new(Dialect::Postgres).update(
            "orders",
            "status = :status",
            "id = :id",
        );
        assert_eq!(
            stmt.sql(),
            "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND deleted_at IS NULL"
        );
        let touch = StatementBuilder::new(Dialect::Sqlite).update("sessions", "", "id = :id");
        assert_eq!(
            touch.sql(),
            "UPDATE sessions SET updated_at = CURRENT_TIMESTAMP WHERE id = ? AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_update_from_record() {
        let stmt = StatementBuilder::new(Dialect::MySql)
            .update_from_record::<Session>("sessions", "id = :id");
        assert_eq!(
            stmt.sql(),
            "UPDATE sessions SET account_id = ?, token = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_soft_delete() {
        let stmt = StatementBuilder::new(Dialect::Postgres).soft_delete("products", "id = :id");
        assert_eq!(
            stmt.sql(),
            "UPDATE products SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_page_tail() {
        let stmt = StatementBuilder::new(Dialect::Sqlite).select_page::<Session>("sessions", "");
        assert!(stmt.sql().ends_with("WHERE deleted_at IS NULL ORDER BY id DESC LIMIT ? OFFSET ?"));
        assert_eq!(stmt.params(), ["limit", "offset"]);
    }
}
