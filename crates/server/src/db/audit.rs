//! Audit ledger storage. Append and read only.

use storehouse_core::{AuditEntryId, ResourceKind};

use super::{Db, Params, Record, RepositoryError, Statement};
use crate::models::AuditEntry;

const TABLE: &str = "audit_log";

#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: Db,
    insert: Statement,
    select_by_resource: Statement,
}

impl AuditRepository {
    /// Prepare the ledger statements.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error for the first statement the
    /// server rejects.
    pub async fn new(db: Db) -> Result<Self, RepositoryError> {
        let sb = db.statements();
        Ok(Self {
            insert: db.prepare(sb.insert_from_record::<AuditEntry>(TABLE)).await?,
            select_by_resource: db
                .prepare(sb.select_with::<AuditEntry>(
                    TABLE,
                    "resource_type = :resource_type AND resource_id = :resource_id",
                    "ORDER BY id",
                ))
                .await?,
            db,
        })
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn insert(&self, entry: &AuditEntry) -> Result<AuditEntryId, RepositoryError> {
        self.db
            .insert_returning_id(&self.insert, &entry.to_params())
            .await
            .map(AuditEntryId::new)
    }

    /// Append every entry in one transaction.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error; no entry is written on failure.
    pub async fn batch_insert(&self, entries: &[AuditEntry]) -> Result<(), RepositoryError> {
        let mut tx = self.db.begin().await?;
        let outcome = async {
            for entry in entries {
                self.insert.execute(tx.conn(), &entry.to_params()).await?;
            }
            Ok(())
        }
        .await;
        tx.finish(outcome).await
    }

    /// Every entry about one resource, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn select_by_resource(
        &self,
        resource: ResourceKind,
        resource_id: i64,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let params = Params::new()
            .with("resource_type", resource)
            .with("resource_id", resource_id);
        self.db.fetch_all(&self.select_by_resource, &params).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storehouse_core::{AccountId, EntryKind};

    use super::*;
    use crate::db::open_in_memory;

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let repo = AuditRepository::new(open_in_memory().await.unwrap()).await.unwrap();
        let entry = AuditEntry::new(EntryKind::Creation, ResourceKind::Order, 3, AccountId::new(9));
        let id = repo.insert(&entry).await.unwrap();

        let entries = repo.select_by_resource(ResourceKind::Order, 3).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].base.id, id.as_i64());
        assert_eq!(entries[0].kind, EntryKind::Creation);
        assert_eq!(entries[0].executor, AccountId::new(9));
        assert!(repo.select_by_resource(ResourceKind::Product, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_insert_keeps_order() {
        let repo = AuditRepository::new(open_in_memory().await.unwrap()).await.unwrap();
        let entries: Vec<AuditEntry> = [
            EntryKind::Creation,
            EntryKind::Modification,
            EntryKind::Deletion,
        ]
        .into_iter()
        .map(|kind| AuditEntry::new(kind, ResourceKind::Product, 1, AccountId::SYSTEM))
        .collect();
        repo.batch_insert(&entries).await.unwrap();

        let kinds: Vec<EntryKind> = repo
            .select_by_resource(ResourceKind::Product, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EntryKind::Creation, EntryKind::Modification, EntryKind::Deletion]);
    }
}
