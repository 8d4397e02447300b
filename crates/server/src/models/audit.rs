//! Audit ledger entries.

use serde::Serialize;
use sqlx::any::AnyRow;
use storehouse_core::{AccountId, EntryKind, ResourceKind};

use super::Base;
use crate::db::RepositoryError;
use crate::db::schema::{FieldDef, FieldKind, Record, Schema, ValueType, read, read_code};
use crate::db::statement::Params;

/// Who did what to which resource. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub base: Base,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "resource_type")]
    pub resource: ResourceKind,
    pub resource_id: i64,
    #[serde(rename = "executor_id")]
    pub executor: AccountId,
}

pub static AUDIT_SCHEMA: Schema = Schema {
    name: "audit_entry",
    fields: &[
        FieldDef::new("base", FieldKind::Base),
        FieldDef::new("kind", FieldKind::Scalar(ValueType::Int))
            .column("type")
            .rename("type")
            .read_only(),
        FieldDef::new("resource", FieldKind::Scalar(ValueType::Int))
            .column("resource_type")
            .rename("resource_type")
            .read_only(),
        FieldDef::new("resource_id", FieldKind::Scalar(ValueType::Int)).read_only(),
        FieldDef::new("executor", FieldKind::Scalar(ValueType::Int))
            .column("executor_id")
            .rename("executor_id")
            .read_only(),
    ],
    is_base: false,
};

impl AuditEntry {
    #[must_use]
    pub fn new(
        kind: EntryKind,
        resource: ResourceKind,
        resource_id: i64,
        executor: AccountId,
    ) -> Self {
        Self {
            base: Base::default(),
            kind,
            resource,
            resource_id,
            executor,
        }
    }
}

impl Record for AuditEntry {
    const SCHEMA: &'static Schema = &AUDIT_SCHEMA;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn to_params(&self) -> Params {
        Params::new()
            .with("type", self.kind)
            .with("resource_type", self.resource)
            .with("resource_id", self.resource_id)
            .with("executor_id", self.executor)
    }

    fn from_row(row: &AnyRow) -> Result<Self, RepositoryError> {
        Ok(Self {
            base: Base::from_row(row)?,
            kind: read_code(row, "type")?,
            resource: read_code(row, "resource_type")?,
            resource_id: read(row, "resource_id")?,
            executor: AccountId::new(read(row, "executor_id")?),
        })
    }
}
