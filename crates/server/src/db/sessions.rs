//! Session repository.
//!
//! A session is live while its row is not soft-deleted and its `updated_at`
//! lies inside the sliding window. Every authenticated use moves `updated_at`
//! forward through [`SessionRepository::extend`].

use storehouse_core::{AccountId, SessionId};

use super::dialect::IntervalUnit;
use super::{Db, Params, Record, RepositoryError, Statement, affected};
use crate::models::Session;

const TABLE: &str = "sessions";

#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: Db,
    select_by_token: Statement,
    select_by_id: Statement,
    insert: Statement,
    extend: Statement,
    delete: Statement,
    delete_by_account: Statement,
}

impl SessionRepository {
    /// Prepare every session statement; `window_minutes` is the sliding
    /// expiry window baked into the token lookup.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error for the first statement the
    /// server rejects.
    pub async fn new(db: Db, window_minutes: i64) -> Result<Self, RepositoryError> {
        let sb = db.statements();
        let dialect = db.dialect();
        let cutoff = dialect.interval(dialect.now(), &[(IntervalUnit::Minute, -window_minutes)]);
        Ok(Self {
            select_by_token: db
                .prepare(sb.select::<Session>(
                    TABLE,
                    &format!("token = :token AND updated_at >= {cutoff}"),
                ))
                .await?,
            select_by_id: db.prepare(sb.select::<Session>(TABLE, "id = :id")).await?,
            insert: db.prepare(sb.insert_from_record::<Session>(TABLE)).await?,
            extend: db.prepare(sb.update(TABLE, "", "id = :id")).await?,
            delete: db.prepare(sb.soft_delete(TABLE, "id = :id")).await?,
            delete_by_account: db
                .prepare(sb.soft_delete(TABLE, "account_id = :account_id"))
                .await?,
            db,
        })
    }

    /// Resolve a token to its live, unexpired session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for unknown, invalidated, or
    /// expired tokens.
    pub async fn select_by_token(&self, token: &str) -> Result<Session, RepositoryError> {
        self.db
            .fetch_one(&self.select_by_token, &Params::new().with("token", token))
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the session is gone.
    pub async fn select_by_id(&self, id: SessionId) -> Result<Session, RepositoryError> {
        self.db
            .fetch_one(&self.select_by_id, &Params::new().with("id", id))
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` on a token collision.
    pub async fn insert(&self, session: &Session) -> Result<Session, RepositoryError> {
        let id = self
            .db
            .insert_returning_id(&self.insert, &session.to_params())
            .await?;
        self.select_by_id(SessionId::new(id)).await
    }

    /// Move `updated_at` to now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the session is gone.
    pub async fn extend(&self, id: SessionId) -> Result<(), RepositoryError> {
        affected(self.db.execute(&self.extend, &Params::new().with("id", id)).await?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the session is already gone.
    pub async fn delete(&self, id: SessionId) -> Result<(), RepositoryError> {
        affected(self.db.execute(&self.delete, &Params::new().with("id", id)).await?)?;
        Ok(())
    }

    /// Invalidate every live session of `account_id`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn delete_by_account(&self, account_id: AccountId) -> Result<u64, RepositoryError> {
        self.db
            .execute(
                &self.delete_by_account,
                &Params::new().with("account_id", account_id),
            )
            .await
    }
}
