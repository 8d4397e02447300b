//! Orders, their line items, and the total invariant.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sqlx::any::AnyRow;
use storehouse_core::{AccountId, OrderId, OrderStatus, ProductId};

use super::Base;
use crate::db::RepositoryError;
use crate::db::codec::{ArrayElement, DbArray, DecodeError, json_to_f64, json_to_i64, json_type};
use crate::db::schema::{FieldDef, FieldKind, Record, Schema, ValueType, read, read_code};
use crate::db::statement::Params;
use crate::patch::{FieldValue, PatchError, Patchable, code};

/// One ordered product: `product_id,amount,price` in storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub amount: i64,
    pub price: f64,
}

impl LineItem {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.price * self.amount as f64
    }
}

impl ArrayElement for LineItem {
    const KIND: &'static str = "line item";

    fn encode_element(&self) -> String {
        format!("{},{},{}", self.product_id, self.amount, self.price)
    }

    fn decode_element(fragment: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::Element {
            expected: Self::KIND,
            fragment: fragment.to_owned(),
        };
        let mut parts = fragment.splitn(3, ',');
        let (Some(product_id), Some(amount), Some(price)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self {
            product_id: ProductId::new(product_id.parse().map_err(|_| invalid())?),
            amount: amount.parse().map_err(|_| invalid())?,
            price: price.parse().map_err(|_| invalid())?,
        })
    }

    fn from_json(value: &Json) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or(DecodeError::Json {
            expected: "object",
            found: json_type(value),
        })?;
        let field = |name: &str| object.get(name).unwrap_or(&Json::Null);
        let int = |name: &str| {
            json_to_i64(field(name)).ok_or(DecodeError::Json {
                expected: "integer",
                found: json_type(field(name)),
            })
        };
        Ok(Self {
            product_id: ProductId::new(int("product_id")?),
            amount: int("amount")?,
            price: json_to_f64(field("price")).ok_or(DecodeError::Json {
                expected: "float",
                found: json_type(field("price")),
            })?,
        })
    }
}

/// Shipping and invoice addresses, stored inline in the `orders` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addressing {
    pub shipping_address: String,
    pub invoice_address: String,
}

pub static ADDRESSING_SCHEMA: Schema = Schema {
    name: "addressing",
    fields: &[
        FieldDef::new("shipping_address", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("invoice_address", FieldKind::Scalar(ValueType::Text)),
    ],
    is_base: false,
};

impl Patchable for Addressing {
    fn schema(&self) -> &'static Schema {
        &ADDRESSING_SCHEMA
    }

    fn assign(&mut self, field: &'static str, value: FieldValue) -> Result<(), PatchError> {
        match (field, value) {
            ("shipping_address", FieldValue::Text(v)) => self.shipping_address = v,
            ("invoice_address", FieldValue::Text(v)) => self.invoice_address = v,
            (field, _) => {
                return Err(PatchError::Unassignable {
                    schema: ADDRESSING_SCHEMA.name,
                    field,
                });
            }
        }
        Ok(())
    }
}

/// An order placed by one account.
///
/// `total` is derived: call [`update_total`](Self::update_total) after any
/// change to the line items or shipping price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    #[serde(flatten)]
    pub base: Base,
    pub status: OrderStatus,
    #[serde(rename = "order_by")]
    pub owner: AccountId,
    #[serde(flatten)]
    pub addressing: Addressing,
    pub products: DbArray<LineItem>,
    pub shipping_price: f64,
    pub total: f64,
}

pub static ORDER_SCHEMA: Schema = Schema {
    name: "order",
    fields: &[
        FieldDef::new("base", FieldKind::Base),
        FieldDef::new("status", FieldKind::Scalar(ValueType::Int)),
        FieldDef::new("owner", FieldKind::Scalar(ValueType::Int))
            .column("order_by")
            .rename("order_by")
            .read_only(),
        FieldDef::new("addressing", FieldKind::Nested(&ADDRESSING_SCHEMA)),
        FieldDef::new("products", FieldKind::Array),
        FieldDef::new("shipping_price", FieldKind::Scalar(ValueType::Float)),
        FieldDef::new("total", FieldKind::Scalar(ValueType::Float)).read_only(),
    ],
    is_base: false,
};

impl Order {
    #[must_use]
    pub const fn id(&self) -> OrderId {
        OrderId::new(self.base.id)
    }

    /// Sum of line-item subtotals plus shipping.
    pub fn update_total(&mut self) {
        self.total =
            self.products.iter().map(LineItem::subtotal).sum::<f64>() + self.shipping_price;
    }
}

impl Record for Order {
    const SCHEMA: &'static Schema = &ORDER_SCHEMA;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn to_params(&self) -> Params {
        Params::new()
            .with("status", self.status)
            .with("order_by", self.owner)
            .with("shipping_address", self.addressing.shipping_address.as_str())
            .with("invoice_address", self.addressing.invoice_address.as_str())
            .with("products", self.products.encode())
            .with("shipping_price", self.shipping_price)
            .with("total", self.total)
    }

    fn from_row(row: &AnyRow) -> Result<Self, RepositoryError> {
        let products: String = read(row, "products")?;
        Ok(Self {
            base: Base::from_row(row)?,
            status: read_code(row, "status")?,
            owner: AccountId::new(read(row, "order_by")?),
            addressing: Addressing {
                shipping_address: read(row, "shipping_address")?,
                invoice_address: read(row, "invoice_address")?,
            },
            products: DbArray::decode(&products)
                .map_err(|e| RepositoryError::DataCorruption(format!("column products: {e}")))?,
            shipping_price: read(row, "shipping_price")?,
            total: read(row, "total")?,
        })
    }
}

impl Patchable for Order {
    fn schema(&self) -> &'static Schema {
        &ORDER_SCHEMA
    }

    fn assign(&mut self, field: &'static str, value: FieldValue) -> Result<(), PatchError> {
        match (field, value) {
            ("status", FieldValue::Int(v)) => self.status = code(field, v)?,
            ("products", FieldValue::List(items)) => {
                self.products = DbArray::from_json(&items).map_err(|e| PatchError::InvalidValue {
                    field,
                    reason: e.to_string(),
                })?;
            }
            ("shipping_price", FieldValue::Float(v)) => self.shipping_price = v,
            (field, _) => {
                return Err(PatchError::Unassignable {
                    schema: ORDER_SCHEMA.name,
                    field,
                });
            }
        }
        Ok(())
    }

    fn nested_mut(&mut self, field: &'static str) -> Option<&mut dyn Patchable> {
        match field {
            "addressing" => Some(&mut self.addressing),
            _ => None,
        }
    }
}

/// Payload for `POST /api/order`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCreate {
    pub shipping_address: String,
    pub invoice_address: String,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default)]
    pub shipping_price: f64,
}

impl OrderCreate {
    /// A freshly created order owned by `owner`, total computed.
    #[must_use]
    pub fn into_order(self, owner: AccountId) -> Order {
        let mut order = Order {
            base: Base::default(),
            status: OrderStatus::Created,
            owner,
            addressing: Addressing {
                shipping_address: self.shipping_address,
                invoice_address: self.invoice_address,
            },
            products: self.products.into(),
            shipping_price: self.shipping_price,
            total: 0.0,
        };
        order.update_total();
        order
    }
}
