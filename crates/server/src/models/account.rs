//! Accounts and the payloads that create them.

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use storehouse_core::{AccountId, AuthLevel};

use super::Base;
use crate::db::RepositoryError;
use crate::db::schema::{FieldDef, FieldKind, Record, Schema, ValueType, read, read_code};
use crate::db::statement::Params;
use crate::patch::{FieldValue, PatchError, Patchable};

/// A user or staff account.
///
/// `email` is kept as stored text: a removed account's address is scrambled
/// and no longer parses as an [`Email`](storehouse_core::Email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    #[serde(flatten)]
    pub base: Base,
    #[serde(rename = "type")]
    pub level: AuthLevel,
    pub email: String,
    #[serde(skip)]
    pub password_digest: String,
    pub name: String,
    pub surname: String,
}

pub static ACCOUNT_SCHEMA: Schema = Schema {
    name: "account",
    fields: &[
        FieldDef::new("base", FieldKind::Base),
        FieldDef::new("level", FieldKind::Scalar(ValueType::Int))
            .column("type")
            .rename("type")
            .read_only(),
        FieldDef::new("email", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("password_digest", FieldKind::Scalar(ValueType::Text)).read_only(),
        FieldDef::new("name", FieldKind::Scalar(ValueType::Text)),
        FieldDef::new("surname", FieldKind::Scalar(ValueType::Text)),
    ],
    is_base: false,
};

impl Account {
    #[must_use]
    pub const fn id(&self) -> AccountId {
        AccountId::new(self.base.id)
    }
}

impl Record for Account {
    const SCHEMA: &'static Schema = &ACCOUNT_SCHEMA;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn to_params(&self) -> Params {
        Params::new()
            .with("type", self.level)
            .with("email", self.email.as_str())
            .with("password_digest", self.password_digest.as_str())
            .with("name", self.name.as_str())
            .with("surname", self.surname.as_str())
    }

    fn from_row(row: &AnyRow) -> Result<Self, RepositoryError> {
        Ok(Self {
            base: Base::from_row(row)?,
            level: read_code(row, "type")?,
            email: read(row, "email")?,
            password_digest: read(row, "password_digest")?,
            name: read(row, "name")?,
            surname: read(row, "surname")?,
        })
    }
}

impl Patchable for Account {
    fn schema(&self) -> &'static Schema {
        &ACCOUNT_SCHEMA
    }

    fn assign(&mut self, field: &'static str, value: FieldValue) -> Result<(), PatchError> {
        match (field, value) {
            ("email", FieldValue::Text(v)) => self.email = v,
            ("name", FieldValue::Text(v)) => self.name = v,
            ("surname", FieldValue::Text(v)) => self.surname = v,
            (field, _) => {
                return Err(PatchError::Unassignable {
                    schema: ACCOUNT_SCHEMA.name,
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Credentials for `POST /api/account/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountLogin {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /api/account/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountCreate {
    #[serde(flatten)]
    pub login: AccountLogin,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
}

/// Password rule: at least 8 characters with an upper-case letter, a
/// lower-case letter, a digit, and one other character.
#[must_use]
pub fn password_is_strong(password: &str) -> bool {
    let (mut upper, mut lower, mut digit, mut other) = (false, false, false, false);
    for c in password.chars() {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c.is_numeric() {
            digit = true;
        } else {
            other = true;
        }
    }
    password.chars().count() >= 8 && upper && lower && digit && other
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_rule() {
        assert!(password_is_strong("Secr3t!pass"));
        assert!(!password_is_strong("S3t!a"));
        assert!(!password_is_strong("secr3t!pass"));
        assert!(!password_is_strong("SECR3T!PASS"));
        assert!(!password_is_strong("Secret!pass"));
        assert!(!password_is_strong("Secr3tpass"));
    }

    #[test]
    fn test_columns() {
        assert_eq!(
            ACCOUNT_SCHEMA.columns(),
            vec!["type", "email", "password_digest", "name", "surname"]
        );
        let account = Account {
            base: Base::default(),
            level: AuthLevel::Staff,
            email: "a@b.c".to_owned(),
            password_digest: "d".to_owned(),
            name: String::new(),
            surname: String::new(),
        };
        let params = account.to_params();
        assert_eq!(params.names().collect::<Vec<_>>(), ACCOUNT_SCHEMA.columns());
    }

    #[test]
    fn test_digest_is_never_serialized() {
        let account = Account {
            base: Base::default(),
            level: AuthLevel::User,
            email: "a@b.c".to_owned(),
            password_digest: "secret-digest".to_owned(),
            name: "Ann".to_owned(),
            surname: "Lee".to_owned(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["type"], 1);
        assert_eq!(json["email"], "a@b.c");
        assert!(json.get("password_digest").is_none());
        assert!(!json.to_string().contains("secret-digest"));
    }

    #[test]
    fn test_register_payload_flattens_login() {
        let create: AccountCreate = serde_json::from_str(
            r#"{"email":"a@b.c","password":"Secr3t!pass","name":"Ann","surname":"Lee"}"#,
        )
        .unwrap();
        assert_eq!(create.login.email, "a@b.c");
        assert_eq!(create.surname, "Lee");
    }
}
