//! SQL dialect adaptation for the three supported drivers.
//!
//! The dialect is chosen once from configuration and copied into every
//! [`Db`](super::Db) handle and statement builder; nothing switches dialect
//! per call.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Unrecognised `STOREHOUSE_DB_DRIVER` value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown database driver '{0}' (expected mysql, postgres or sqlite3)")]
pub struct UnknownDriver(pub String);

/// Storage driver family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

/// Unit accepted by [`Dialect::interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Hour,
    Minute,
    Second,
}

impl IntervalUnit {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

/// Column storage class, mapped to a concrete type per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    /// Text that participates in an index. `MySQL` cannot index unbounded `TEXT`.
    IndexedText,
    Timestamp,
}

impl Dialect {
    /// Driver identifier as written in configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite3",
        }
    }

    /// Expression evaluating to the current timestamp.
    #[must_use]
    pub const fn now(self) -> &'static str {
        match self {
            Self::Postgres => "NOW()",
            Self::MySql | Self::Sqlite => "CURRENT_TIMESTAMP",
        }
    }

    /// Add each `(unit, magnitude)` pair to `base`. Negative magnitudes subtract.
    #[must_use]
    pub fn interval(self, base: &str, parts: &[(IntervalUnit, i64)]) -> String {
        match self {
            Self::Postgres => parts.iter().fold(base.to_owned(), |expr, (unit, n)| {
                format!("({expr} + INTERVAL '{n} {}')", unit.keyword())
            }),
            Self::MySql => parts.iter().fold(base.to_owned(), |expr, (unit, n)| {
                format!(
                    "DATE_ADD({expr}, INTERVAL {n} {})",
                    unit.keyword().to_ascii_uppercase()
                )
            }),
            Self::Sqlite => {
                if parts.is_empty() {
                    return base.to_owned();
                }
                let modifiers: Vec<String> = parts
                    .iter()
                    .map(|(unit, n)| format!("'{n:+} {}s'", unit.keyword()))
                    .collect();
                format!("datetime({base}, {})", modifiers.join(", "))
            }
        }
    }

    /// DDL fragment for the auto-incrementing surrogate key.
    #[must_use]
    pub const fn primary_key(self) -> &'static str {
        match self {
            Self::Postgres => "BIGSERIAL PRIMARY KEY",
            Self::MySql => "BIGINT PRIMARY KEY AUTO_INCREMENT",
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    #[must_use]
    pub const fn column_type(self, ty: ColumnType) -> &'static str {
        match (self, ty) {
            (Self::Sqlite, ColumnType::Integer) => "INTEGER",
            (_, ColumnType::Integer) => "BIGINT",
            (Self::Postgres, ColumnType::Float) => "DOUBLE PRECISION",
            (Self::MySql, ColumnType::Float) => "DOUBLE",
            (Self::Sqlite, ColumnType::Float) => "REAL",
            (Self::MySql, ColumnType::IndexedText) => "VARCHAR(255)",
            (_, ColumnType::Text | ColumnType::IndexedText) => "TEXT",
            (Self::Postgres, ColumnType::Timestamp) => "TIMESTAMP",
            (_, ColumnType::Timestamp) => "DATETIME",
        }
    }

    /// Whether inserts can return the generated id (`RETURNING id`).
    ///
    /// `MySQL` reports it through the execution result instead.
    #[must_use]
    pub const fn returns_inserted_id(self) -> bool {
        !matches!(self, Self::MySql)
    }

    /// Whether `CREATE INDEX IF NOT EXISTS` is understood.
    #[must_use]
    pub const fn supports_index_if_not_exists(self) -> bool {
        !matches!(self, Self::MySql)
    }

    /// String concatenation of SQL expressions.
    #[must_use]
    pub fn concat(self, parts: &[&str]) -> String {
        match self {
            Self::MySql => format!("CONCAT({})", parts.join(", ")),
            Self::Postgres | Self::Sqlite => parts.join(" || "),
        }
    }

    /// Select-list expression reading a timestamp column back as text.
    #[must_use]
    pub fn timestamp_as_text(self, column: &str) -> String {
        match self {
            Self::Postgres | Self::Sqlite => format!("CAST({column} AS TEXT) AS {column}"),
            Self::MySql => format!("CAST({column} AS CHAR) AS {column}"),
        }
    }

    /// Rewrite `:name` placeholders into the driver's positional form.
    ///
    /// Returns the rewritten text and the parameter names in binding order.
    /// `PostgreSQL` reuses one `$n` for a repeated name; the other drivers bind
    /// once per occurrence. `::` casts and quoted literals are left alone.
    #[must_use]
    pub fn bind_named(self, sql: &str) -> (String, Vec<String>) {
        let mut out = String::with_capacity(sql.len());
        let mut names: Vec<String> = Vec::new();
        let mut chars = sql.chars().peekable();
        let mut quote: Option<char> = None;

        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                out.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                ':' if chars.peek() == Some(&':') => {
                    out.push_str("::");
                    chars.next();
                }
                ':' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    match self {
                        Self::Postgres => {
                            let index = match names.iter().position(|seen| *seen == name) {
                                Some(i) => i + 1,
                                None => {
                                    names.push(name);
                                    names.len()
                                }
                            };
                            out.push('$');
                            out.push_str(&index.to_string());
                        }
                        Self::MySql | Self::Sqlite => {
                            names.push(name);
                            out.push('?');
                        }
                    }
                }
                _ => out.push(c),
            }
        }

        (out, names)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = UnknownDriver;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite3" | "sqlite" => Ok(Self::Sqlite),
            other => Err(UnknownDriver(other.to_owned())),
        }
    }
}
