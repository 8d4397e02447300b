//! Delimited array columns.
//!
//! A sequence is stored in one text column as its elements' string forms
//! joined with `;`. Text elements escape the delimiter and the escape
//! character (`\;`, `\\`); an empty text element is written as `\e` so that
//! `[""]` and `[]` stay distinct.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

pub const DELIMITER: char = ';';
const ESCAPE: char = '\\';
const EMPTY_MARK: &str = "\\e";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid {expected} element '{fragment}'")]
    Element {
        expected: &'static str,
        fragment: String,
    },
    #[error("array text ends with a dangling escape")]
    DanglingEscape,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("expected {expected}, found {found}")]
    Json {
        expected: &'static str,
        found: &'static str,
    },
}

/// Element type storable in a delimited array column.
pub trait ArrayElement: Sized {
    /// Name used in error messages.
    const KIND: &'static str;

    /// String form of one element. Must not contain an unescaped delimiter.
    fn encode_element(&self) -> String;

    /// Parse one fragment exactly as produced by [`encode_element`](Self::encode_element).
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` when the fragment is not a valid element.
    fn decode_element(fragment: &str) -> Result<Self, DecodeError>;

    /// Build one element from a JSON value (patch documents).
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Json` on a shape or type mismatch.
    fn from_json(value: &Json) -> Result<Self, DecodeError>;
}

/// JSON type name for error messages.
#[must_use]
pub fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "integer",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Integer from a JSON number, truncating floats.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn json_to_i64(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

pub(crate) fn json_to_f64(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        _ => None,
    }
}

impl ArrayElement for String {
    const KIND: &'static str = "string";

    fn encode_element(&self) -> String {
        if self.is_empty() {
            return EMPTY_MARK.to_owned();
        }
        let mut out = String::with_capacity(self.len());
        for c in self.chars() {
            if c == ESCAPE || c == DELIMITER {
                out.push(ESCAPE);
            }
            out.push(c);
        }
        out
    }

    fn decode_element(fragment: &str) -> Result<Self, DecodeError> {
        if fragment == EMPTY_MARK {
            return Ok(Self::new());
        }
        let mut out = Self::with_capacity(fragment.len());
        let mut chars = fragment.chars();
        while let Some(c) = chars.next() {
            if c == ESCAPE {
                match chars.next() {
                    Some(e @ (ESCAPE | DELIMITER)) => out.push(e),
                    Some(other) => return Err(DecodeError::InvalidEscape(other)),
                    None => return Err(DecodeError::DanglingEscape),
                }
            } else {
                out.push(c);
            }
        }
        Ok(out)
    }

    fn from_json(value: &Json) -> Result<Self, DecodeError> {
        value.as_str().map(str::to_owned).ok_or(DecodeError::Json {
            expected: Self::KIND,
            found: json_type(value),
        })
    }
}

impl ArrayElement for i64 {
    const KIND: &'static str = "integer";

    fn encode_element(&self) -> String {
        self.to_string()
    }

    fn decode_element(fragment: &str) -> Result<Self, DecodeError> {
        fragment.parse().map_err(|_| DecodeError::Element {
            expected: Self::KIND,
            fragment: fragment.to_owned(),
        })
    }

    fn from_json(value: &Json) -> Result<Self, DecodeError> {
        json_to_i64(value).ok_or(DecodeError::Json {
            expected: Self::KIND,
            found: json_type(value),
        })
    }
}

impl ArrayElement for f64 {
    const KIND: &'static str = "float";

    fn encode_element(&self) -> String {
        self.to_string()
    }

    fn decode_element(fragment: &str) -> Result<Self, DecodeError> {
        fragment.parse().map_err(|_| DecodeError::Element {
            expected: Self::KIND,
            fragment: fragment.to_owned(),
        })
    }

    fn from_json(value: &Json) -> Result<Self, DecodeError> {
        json_to_f64(value).ok_or(DecodeError::Json {
            expected: Self::KIND,
            found: json_type(value),
        })
    }
}

/// Join element string forms with the delimiter.
#[must_use]
pub fn encode<T: ArrayElement>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(ArrayElement::encode_element).collect();
    parts.join(&DELIMITER.to_string())
}

/// Split on unescaped delimiters and decode each fragment.
///
/// # Errors
///
/// Returns the first fragment's `DecodeError`.
pub fn decode<T: ArrayElement>(text: &str) -> Result<Vec<T>, DecodeError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    let mut fragment = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => {
                fragment.push(c);
                fragment.push(chars.next().ok_or(DecodeError::DanglingEscape)?);
            }
            DELIMITER => items.push(T::decode_element(&std::mem::take(&mut fragment))?),
            _ => fragment.push(c),
        }
    }
    items.push(T::decode_element(&fragment)?);
    Ok(items)
}

/// A sequence persisted as one delimited text column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbArray<T>(Vec<T>);

impl<T: ArrayElement> DbArray<T> {
    #[must_use]
    pub const fn new(items: Vec<T>) -> Self {
        Self(items)
    }

    #[must_use]
    pub fn encode(&self) -> String {
        encode(&self.0)
    }

    /// # Errors
    ///
    /// Returns `DecodeError` when any fragment fails to decode.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        decode(text).map(Self)
    }

    /// Rebuild from a JSON list, element by element.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Json` for the first element of the wrong shape.
    pub fn from_json(items: &[Json]) -> Result<Self, DecodeError> {
        items.iter().map(T::from_json).collect::<Result<Vec<_>, _>>().map(Self)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for DbArray<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for DbArray<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<Vec<T>> for DbArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}
