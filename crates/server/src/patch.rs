//! Sparse updates from JSON documents onto typed records.
//!
//! [`patch`] walks the target's [`Schema`], looks up each patchable field's
//! key in the change map, coerces the JSON value to the field's declared
//! type, and hands it to [`Patchable::assign`]. Base fields and read-only
//! fields are never touched; unknown keys are ignored. The work happens on a
//! copy that replaces the target only when every field applied cleanly.

use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::db::codec::{json_to_f64, json_to_i64, json_type};
use crate::db::schema::{FieldDef, FieldKind, Schema, ValueType};

/// A coerced value ready for assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    /// Raw list elements, rebuilt by the record through its array codec.
    List(Vec<Json>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The target is the base record itself.
    #[error("{0} records cannot be patched")]
    InvalidTarget(&'static str),

    #[error("field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Right JSON type, but not a legal value for the field.
    #[error("field {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The schema declares a field its record does not know how to assign.
    #[error("{schema} cannot assign field {field}")]
    Unassignable {
        schema: &'static str,
        field: &'static str,
    },
}

impl PatchError {
    /// Errors caused by the patch document rather than by the code.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. } | Self::InvalidValue { .. })
    }
}

/// A record the patch engine can write into.
pub trait Patchable {
    fn schema(&self) -> &'static Schema;

    /// Store an already-coerced value into the field named `field`.
    ///
    /// # Errors
    ///
    /// Returns `PatchError::InvalidValue` when the value is out of range for
    /// the field, or `PatchError::Unassignable` for an unknown field.
    fn assign(&mut self, field: &'static str, value: FieldValue) -> Result<(), PatchError>;

    /// The sub-record behind a [`FieldKind::Nested`] field.
    fn nested_mut(&mut self, _field: &'static str) -> Option<&mut dyn Patchable> {
        None
    }
}

/// Apply `changes` to `target`, all or nothing.
///
/// # Errors
///
/// Returns `PatchError::InvalidTarget` for the base record and the first
/// coercion or assignment error otherwise; `target` is then unchanged.
pub fn patch<T: Patchable + Clone>(
    target: &mut T,
    changes: &Map<String, Json>,
) -> Result<(), PatchError> {
    let schema = target.schema();
    if schema.is_base {
        return Err(PatchError::InvalidTarget(schema.name));
    }
    let mut draft = target.clone();
    apply(&mut draft, changes)?;
    *target = draft;
    Ok(())
}

fn apply(target: &mut dyn Patchable, changes: &Map<String, Json>) -> Result<(), PatchError> {
    let schema = target.schema();
    for field in schema.fields {
        let shape = match field.kind {
            FieldKind::Base | FieldKind::Excluded => continue,
            FieldKind::Nested(_) => {
                let inner = target.nested_mut(field.name).ok_or(PatchError::Unassignable {
                    schema: schema.name,
                    field: field.name,
                })?;
                apply(inner, changes)?;
                continue;
            }
            FieldKind::Scalar(ty) => Some(ty),
            FieldKind::Array => None,
        };
        if !field.patch {
            continue;
        }
        if let Some(value) = changes.get(field.key()) {
            target.assign(field.name, coerce(field, shape, value)?)?;
        }
    }
    Ok(())
}

/// `shape` is the scalar type, or `None` for an array field.
fn coerce(
    field: &FieldDef,
    shape: Option<ValueType>,
    value: &Json,
) -> Result<FieldValue, PatchError> {
    let mismatch = |expected: &'static str| PatchError::TypeMismatch {
        field: field.name,
        expected,
        found: json_type(value),
    };
    match shape {
        Some(ValueType::Int) => json_to_i64(value)
            .map(FieldValue::Int)
            .ok_or_else(|| mismatch("integer")),
        Some(ValueType::Float) => json_to_f64(value)
            .map(FieldValue::Float)
            .ok_or_else(|| mismatch("float")),
        Some(ValueType::Text) => value
            .as_str()
            .map(|s| FieldValue::Text(s.to_owned()))
            .ok_or_else(|| mismatch("string")),
        None => value
            .as_array()
            .map(|items| FieldValue::List(items.clone()))
            .ok_or_else(|| mismatch("array")),
    }
}

/// Convert an integer field value into one of the coded enumerations.
///
/// # Errors
///
/// Returns `PatchError::InvalidValue` for unknown codes.
pub fn code<T>(field: &'static str, code: i64) -> Result<T, PatchError>
where
    T: TryFrom<i64, Error = storehouse_core::UnknownCode>,
{
    T::try_from(code).map_err(|e| PatchError::InvalidValue {
        field,
        reason: e.to_string(),
    })
}
