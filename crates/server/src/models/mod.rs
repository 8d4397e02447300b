//! Domain models and their persisted shape.
//!
//! Every model embeds a [`Base`] and declares a static
//! [`Schema`](crate::db::schema::Schema) that drives both statement
//! generation and patching.

pub mod account;
pub mod audit;
pub mod order;
pub mod product;
pub mod session;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::any::AnyRow;

use crate::db::RepositoryError;
use crate::db::schema::{
    FieldDef, FieldKind, Schema, ValueType, read, read_optional_timestamp, read_timestamp,
};
use crate::patch::{FieldValue, PatchError, Patchable};

pub use account::{Account, AccountCreate, AccountLogin};
pub use audit::AuditEntry;
pub use order::{Addressing, LineItem, Order, OrderCreate};
pub use product::{Product, ProductCreate};
pub use session::Session;

/// Storage-managed columns shared by every table.
///
/// Written only by storage: `id` and `created_at` on insert, `updated_at` on
/// every update, `deleted_at` on soft delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Base {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

pub static BASE_SCHEMA: Schema = Schema {
    name: "base",
    fields: &[
        FieldDef::new("id", FieldKind::Scalar(ValueType::Int)),
        FieldDef::new("created_at", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("updated_at", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("deleted_at", FieldKind::Scalar(ValueType::Text)),
    ],
    is_base: true,
};

impl Base {
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` on missing or malformed columns.
    pub fn from_row(row: &AnyRow) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: read(row, "id")?,
            created_at: read_timestamp(row, "created_at")?,
            updated_at: read_timestamp(row, "updated_at")?,
            deleted_at: read_optional_timestamp(row, "deleted_at")?,
        })
    }
}

impl Patchable for Base {
    fn schema(&self) -> &'static Schema {
        &BASE_SCHEMA
    }

    fn assign(&mut self, field: &'static str, _value: FieldValue) -> Result<(), PatchError> {
        Err(PatchError::Unassignable {
            schema: BASE_SCHEMA.name,
            field,
        })
    }
}
