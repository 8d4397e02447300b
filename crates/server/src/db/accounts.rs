//! Account repository.

use storehouse_core::{AccountId, Email};

use super::{Db, Params, Record, RepositoryError, Statement, affected};
use crate::models::Account;

const TABLE: &str = "accounts";

/// Repository for account rows.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: Db,
    select_by_email: Statement,
    select_by_id: Statement,
    insert: Statement,
    update: Statement,
    update_digest: Statement,
    scramble_email: Statement,
    delete: Statement,
}

impl AccountRepository {
    /// Prepare every account statement.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error for the first statement the
    /// server rejects.
    pub async fn new(db: Db) -> Result<Self, RepositoryError> {
        let sb = db.statements();
        // '@<id>:<email>' no longer parses as an address and frees the unique index.
        let scrambled = db.dialect().concat(&["'@'", "id", "':'", "email"]);
        Ok(Self {
            select_by_email: db.prepare(sb.select::<Account>(TABLE, "email = :email")).await?,
            select_by_id: db.prepare(sb.select::<Account>(TABLE, "id = :id")).await?,
            insert: db.prepare(sb.insert_from_record::<Account>(TABLE)).await?,
            update: db
                .prepare(sb.update(
                    TABLE,
                    "email = :email, name = :name, surname = :surname",
                    "id = :id",
                ))
                .await?,
            update_digest: db
                .prepare(sb.update(TABLE, "password_digest = :password_digest", "id = :id"))
                .await?,
            scramble_email: db
                .prepare(sb.update(TABLE, &format!("email = {scrambled}"), "id = :id"))
                .await?,
            delete: db.prepare(sb.soft_delete(TABLE, "id = :id")).await?,
            db,
        })
    }

    /// The live account registered under `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn select_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        self.db
            .fetch_optional(&self.select_by_email, &Params::new().with("email", email.as_str()))
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no live account has `id`.
    pub async fn select_by_id(&self, id: AccountId) -> Result<Account, RepositoryError> {
        self.db
            .fetch_one(&self.select_by_id, &Params::new().with("id", id))
            .await
    }

    /// Insert `account` and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` when the email is taken.
    pub async fn insert(&self, account: &Account) -> Result<Account, RepositoryError> {
        let id = self
            .db
            .insert_returning_id(&self.insert, &account.to_params())
            .await?;
        self.select_by_id(AccountId::new(id)).await
    }

    /// Write the profile columns (email, name, surname).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for a missing account and
    /// `RepositoryError::Duplicate` when the new email is taken.
    pub async fn update(&self, account: &Account) -> Result<(), RepositoryError> {
        let params = Params::new()
            .with("email", account.email.as_str())
            .with("name", account.name.as_str())
            .with("surname", account.surname.as_str())
            .with("id", account.id());
        affected(self.db.execute(&self.update, &params).await?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for a missing account.
    pub async fn update_digest(&self, id: AccountId, digest: &str) -> Result<(), RepositoryError> {
        let params = Params::new().with("password_digest", digest).with("id", id);
        affected(self.db.execute(&self.update_digest, &params).await?)?;
        Ok(())
    }

    /// Scramble the email, then soft delete, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for a missing account; nothing is
    /// changed on failure.
    pub async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let params = Params::new().with("id", id);
        let mut tx = self.db.begin().await?;
        let outcome = async {
            affected(self.scramble_email.execute(tx.conn(), &params).await?)?;
            affected(self.delete.execute(tx.conn(), &params).await?)
        }
        .await;
        tx.finish(outcome).await?;
        Ok(())
    }
}
