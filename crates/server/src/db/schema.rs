//! Static record descriptors.
//!
//! Each persisted type declares a [`Schema`]: its fields in declaration order
//! with their column name, external (JSON) key, patchability, and kind. The
//! statement builder derives column lists from it and the patch engine walks
//! it to apply sparse updates.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::any::{Any, AnyRow};
use sqlx::{Decode, Row, Type};

use super::RepositoryError;
use super::statement::Params;

/// Scalar type of a field, as seen by the patch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "integer",
            Self::Float => "float",
            Self::Text => "string",
        })
    }
}

/// How a field is persisted.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// The embedded base record (id and timestamps). Never a column of its own.
    Base,
    /// One column holding one value.
    Scalar(ValueType),
    /// One column holding a delimited sequence (see [`codec`](super::codec)).
    Array,
    /// A sub-record whose columns are inlined into the parent.
    Nested(&'static Schema),
    /// Not persisted.
    Excluded,
}

/// One declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Rust field name.
    pub name: &'static str,
    /// Column name, when it differs from `name`.
    pub column: Option<&'static str>,
    /// External key used by patch documents, when it differs from `name`.
    pub rename: Option<&'static str>,
    /// Whether the patch engine may write this field.
    pub patch: bool,
    pub kind: FieldKind,
}

impl FieldDef {
    /// A patchable field stored under its own name.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column: None,
            rename: None,
            patch: true,
            kind,
        }
    }

    #[must_use]
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    #[must_use]
    pub const fn rename(mut self, key: &'static str) -> Self {
        self.rename = Some(key);
        self
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.patch = false;
        self
    }

    #[must_use]
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }

    /// Key looked up in a patch document.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }
}

/// Field table for one record type.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
    /// Set only on the base record itself, which may never be patched.
    pub is_base: bool,
}

impl Schema {
    /// Persisted columns in declaration order.
    ///
    /// The base field and excluded fields are skipped and nested records are
    /// inlined.
    #[must_use]
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(self.fields.len());
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, out: &mut Vec<&'static str>) {
        for field in self.fields {
            match field.kind {
                FieldKind::Base | FieldKind::Excluded => {}
                FieldKind::Nested(inner) => inner.collect_columns(out),
                FieldKind::Scalar(_) | FieldKind::Array => out.push(field.column_name()),
            }
        }
    }
}

/// A Rust type bound to a table row.
pub trait Record: Sized {
    const SCHEMA: &'static Schema;

    fn base(&self) -> &crate::models::Base;

    fn base_mut(&mut self) -> &mut crate::models::Base;

    /// Values for every column of [`Schema::columns`], keyed by column name.
    fn to_params(&self) -> Params;

    /// Decode a row selected with
    /// [`StatementBuilder::select_list`](super::StatementBuilder::select_list).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` when a column is missing or
    /// holds a value the type cannot represent.
    fn from_row(row: &AnyRow) -> Result<Self, RepositoryError>;
}

/// Read a column, reporting decode failures as data corruption.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` naming the column.
pub fn read<'r, T>(row: &'r AnyRow, column: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Any> + Type<Any>,
{
    row.try_get::<T, _>(column)
        .map_err(|e| RepositoryError::DataCorruption(format!("column {column}: {e}")))
}

/// Read an integer code column into one of the core enumerations.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` for unknown codes.
pub fn read_code<T>(row: &AnyRow, column: &str) -> Result<T, RepositoryError>
where
    T: TryFrom<i64, Error = storehouse_core::UnknownCode>,
{
    let code: i64 = read(row, column)?;
    T::try_from(code).map_err(|e| RepositoryError::DataCorruption(format!("column {column}: {e}")))
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a timestamp read back as text (`YYYY-MM-DD HH:MM:SS[.ffffff]`, UTC).
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` when the text is not a timestamp.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, RepositoryError> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid timestamp '{text}': {e}")))
}

/// Read a timestamp column.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` on a missing or unparsable value.
pub fn read_timestamp(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let text: String = read(row, column)?;
    parse_timestamp(&text)
}

/// Read a nullable timestamp column.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` on an unparsable value.
pub fn read_optional_timestamp(
    row: &AnyRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let text: Option<String> = read(row, column)?;
    text.as_deref().map(parse_timestamp).transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    static INNER: Schema = Schema {
        name: "inner",
        fields: &[
            FieldDef::new("street", FieldKind::Scalar(ValueType::Text)),
            FieldDef::new("zip", FieldKind::Scalar(ValueType::Text)).column("postal_code"),
        ],
        is_base: false,
    };

    static OUTER: Schema = Schema {
        name: "outer",
        fields: &[
            FieldDef::new("base", FieldKind::Base),
            FieldDef::new("level", FieldKind::Scalar(ValueType::Int))
                .column("type")
                .rename("type"),
            FieldDef::new("cache", FieldKind::Excluded),
            FieldDef::new("address", FieldKind::Nested(&INNER)),
            FieldDef::new("tags", FieldKind::Array),
        ],
        is_base: false,
    };

    #[test]
    fn test_columns_follow_declaration_rules() {
        assert_eq!(OUTER.columns(), vec!["type", "street", "postal_code", "tags"]);
    }

    #[test]
    fn test_field_key_and_column() {
        let level = &OUTER.fields[1];
        assert_eq!(level.column_name(), "type");
        assert_eq!(level.key(), "type");
        let tags = &OUTER.fields[4];
        assert_eq!(tags.column_name(), "tags");
        assert_eq!(tags.key(), "tags");
        assert!(tags.patch);
        assert!(!FieldDef::new("x", FieldKind::Array).read_only().patch);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let plain = parse_timestamp("2024-03-05 10:20:30").unwrap();
        assert_eq!((plain.year(), plain.month(), plain.day()), (2024, 3, 5));
        assert_eq!((plain.hour(), plain.minute(), plain.second()), (10, 20, 30));

        let fractional = parse_timestamp("2024-03-05 10:20:30.123456").unwrap();
        assert_eq!(fractional.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
