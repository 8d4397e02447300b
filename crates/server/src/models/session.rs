//! Authentication sessions.

use sqlx::any::AnyRow;
use storehouse_core::{AccountId, SessionId};

use super::Base;
use crate::db::RepositoryError;
use crate::db::schema::{FieldDef, FieldKind, Record, Schema, ValueType, read};
use crate::db::statement::Params;

/// An opaque bearer token bound to one account.
///
/// Valid while live and used within the sliding window; every successful
/// use moves `updated_at` forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub base: Base,
    pub account_id: AccountId,
    pub token: String,
}

pub static SESSION_SCHEMA: Schema = Schema {
    name: "session",
    fields: &[
        FieldDef::new("base", FieldKind::Base),
        FieldDef::new("account_id", FieldKind::Scalar(ValueType::Int)).read_only(),
        FieldDef::new("token", FieldKind::Scalar(ValueType::Text)).read_only(),
    ],
    is_base: false,
};

impl Session {
    #[must_use]
    pub fn new(account_id: AccountId, token: String) -> Self {
        Self {
            base: Base::default(),
            account_id,
            token,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SessionId {
        SessionId::new(self.base.id)
    }
}

impl Record for Session {
    const SCHEMA: &'static Schema = &SESSION_SCHEMA;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn to_params(&self) -> Params {
        Params::new()
            .with("account_id", self.account_id)
            .with("token", self.token.as_str())
    }

    fn from_row(row: &AnyRow) -> Result<Self, RepositoryError> {
        Ok(Self {
            base: Base::from_row(row)?,
            account_id: AccountId::new(read(row, "account_id")?),
            token: read(row, "token")?,
        })
    }
}
