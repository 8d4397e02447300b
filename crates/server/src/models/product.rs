//! Catalogue products.

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use storehouse_core::{ProductId, ProductStatus};

use super::Base;
use crate::db::RepositoryError;
use crate::db::codec::DbArray;
use crate::db::schema::{FieldDef, FieldKind, Record, Schema, ValueType, read, read_code};
use crate::db::statement::Params;
use crate::patch::{FieldValue, PatchError, Patchable, code};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    #[serde(flatten)]
    pub base: Base,
    pub status: ProductStatus,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Image references, stored as one delimited column.
    pub images: DbArray<String>,
}

pub static PRODUCT_SCHEMA: Schema = Schema {
    name: "product",
    fields: &[
        FieldDef::new("base", FieldKind::Base),
        FieldDef::new("status", FieldKind::Scalar(ValueType::Int)),
        FieldDef::new("name", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("description", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("price", FieldKind::Scalar(ValueType::Float)),
        FieldDef::new("images", FieldKind::Array),
    ],
    is_base: false,
};

impl Product {
    #[must_use]
    pub const fn id(&self) -> ProductId {
        ProductId::new(self.base.id)
    }
}

impl Record for Product {
    const SCHEMA: &'static Schema = &PRODUCT_SCHEMA;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn to_params(&self) -> Params {
        Params::new()
            .with("status", self.status)
            .with("name", self.name.as_str())
            .with("description", self.description.as_str())
            .with("price", self.price)
            .with("images", self.images.encode())
    }

    fn from_row(row: &AnyRow) -> Result<Self, RepositoryError> {
        let images: String = read(row, "images")?;
        Ok(Self {
            base: Base::from_row(row)?,
            status: read_code(row, "status")?,
            name: read(row, "name")?,
            description: read(row, "description")?,
            price: read(row, "price")?,
            images: DbArray::decode(&images)
                .map_err(|e| RepositoryError::DataCorruption(format!("column images: {e}")))?,
        })
    }
}

impl Patchable for Product {
    fn schema(&self) -> &'static Schema {
        &PRODUCT_SCHEMA
    }

    fn assign(&mut self, field: &'static str, value: FieldValue) -> Result<(), PatchError> {
        match (field, value) {
            ("status", FieldValue::Int(v)) => self.status = code(field, v)?,
            ("name", FieldValue::Text(v)) => self.name = v,
            ("description", FieldValue::Text(v)) => self.description = v,
            ("price", FieldValue::Float(v)) => self.price = v,
            ("images", FieldValue::List(items)) => {
                self.images = DbArray::from_json(&items).map_err(|e| PatchError::InvalidValue {
                    field,
                    reason: e.to_string(),
                })?;
            }
            (field, _) => {
                return Err(PatchError::Unassignable {
                    schema: PRODUCT_SCHEMA.name,
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Payload for `POST /api/product`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    #[serde(default)]
    pub status: ProductStatus,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<ProductCreate> for Product {
    fn from(create: ProductCreate) -> Self {
        Self {
            base: Base::default(),
            status: create.status,
            name: create.name,
            description: create.description,
            price: create.price,
            images: create.images.into(),
        }
    }
}
