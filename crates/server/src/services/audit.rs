//! Audit ledger.
//!
//! [`AuditService::resource`] hands out an [`AuditResource`], a facade bound to
//! one resource kind, so use-cases record entries without repeating it.

use storehouse_core::{AccountId, EntryKind, ResourceKind};
use tracing::{debug, instrument};

use crate::db::{AuditRepository, RepositoryError};
use crate::models::AuditEntry;

#[derive(Debug, Clone)]
pub struct AuditService {
    repo: AuditRepository,
}

impl AuditService {
    #[must_use]
    pub const fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    #[instrument(
        skip_all,
        fields(
            kind = %kind,
            resource = %resource,
            resource_id = resource_id,
            executor = %executor
        )
    )]
    pub async fn record(
        &self,
        kind: EntryKind,
        resource: ResourceKind,
        resource_id: i64,
        executor: AccountId,
    ) -> Result<(), RepositoryError> {
        let id = self
            .repo
            .insert(&AuditEntry::new(kind, resource, resource_id, executor))
            .await?;
        debug!(entry_id = %id, "audit entry recorded");
        Ok(())
    }

    /// Append one entry per id, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error; nothing is recorded on failure.
    #[instrument(
        skip_all,
        fields(
            kind = %kind,
            resource = %resource,
            count = resource_ids.len(),
            executor = %executor
        )
    )]
    pub async fn record_batch(
        &self,
        kind: EntryKind,
        resource: ResourceKind,
        resource_ids: &[i64],
        executor: AccountId,
    ) -> Result<(), RepositoryError> {
        if resource_ids.is_empty() {
            return Ok(());
        }
        let entries: Vec<AuditEntry> = resource_ids
            .iter()
            .map(|id| AuditEntry::new(kind, resource, *id, executor))
            .collect();
        self.repo.batch_insert(&entries).await?;
        debug!("audit batch recorded");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn creation(
        &self,
        resource: ResourceKind,
        executor: AccountId,
        resource_id: i64,
    ) -> Result<(), RepositoryError> {
        self.record(EntryKind::Creation, resource, resource_id, executor).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn modification(
        &self,
        resource: ResourceKind,
        executor: AccountId,
        resource_id: i64,
    ) -> Result<(), RepositoryError> {
        self.record(EntryKind::Modification, resource, resource_id, executor).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn batch_modification(
        &self,
        resource: ResourceKind,
        executor: AccountId,
        resource_ids: &[i64],
    ) -> Result<(), RepositoryError> {
        self.record_batch(EntryKind::Modification, resource, resource_ids, executor)
            .await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn deletion(
        &self,
        resource: ResourceKind,
        executor: AccountId,
        resource_id: i64,
    ) -> Result<(), RepositoryError> {
        self.record(EntryKind::Deletion, resource, resource_id, executor).await
    }

    #[must_use]
    pub fn resource(&self, resource: ResourceKind) -> AuditResource {
        AuditResource {
            audit: self.clone(),
            resource,
        }
    }

    /// Ledger entries about one resource, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn entries_for(
        &self,
        resource: ResourceKind,
        resource_id: i64,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.repo.select_by_resource(resource, resource_id).await
    }
}

/// The ledger narrowed to one resource kind.
#[derive(Debug, Clone)]
pub struct AuditResource {
    audit: AuditService,
    resource: ResourceKind,
}

impl AuditResource {
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.resource
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn creation(
        &self,
        executor: AccountId,
        id: impl Into<i64>,
    ) -> Result<(), RepositoryError> {
        self.audit.creation(self.resource, executor, id.into()).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn modification(
        &self,
        executor: AccountId,
        id: impl Into<i64>,
    ) -> Result<(), RepositoryError> {
        self.audit.modification(self.resource, executor, id.into()).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn batch_modification(
        &self,
        executor: AccountId,
        ids: &[i64],
    ) -> Result<(), RepositoryError> {
        self.audit.batch_modification(self.resource, executor, ids).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn deletion(
        &self,
        executor: AccountId,
        id: impl Into<i64>,
    ) -> Result<(), RepositoryError> {
        self.audit.deletion(self.resource, executor, id.into()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storehouse_core::OrderId;

    use super::*;
    use crate::services::testing::services;

    #[tokio::test]
    async fn test_facade_binds_resource_kind() {
        let audit = services().await.audit;
        let orders = audit.resource(ResourceKind::Order);
        assert_eq!(orders.kind(), ResourceKind::Order);
        orders.creation(AccountId::new(2), OrderId::new(5)).await.unwrap();
        orders.deletion(AccountId::new(3), OrderId::new(5)).await.unwrap();

        let entries = audit.entries_for(ResourceKind::Order, 5).await.unwrap();
        let seen: Vec<(EntryKind, AccountId)> =
            entries.iter().map(|e| (e.kind, e.executor)).collect();
        assert_eq!(
            seen,
            vec![
                (EntryKind::Creation, AccountId::new(2)),
                (EntryKind::Deletion, AccountId::new(3))
            ]
        );
        assert!(audit.entries_for(ResourceKind::Product, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_modification_writes_one_entry_per_id() {
        let audit = services().await.audit;
        audit
            .resource(ResourceKind::Product)
            .batch_modification(AccountId::SYSTEM, &[1, 2, 3])
            .await
            .unwrap();
        for id in 1..=3 {
            let entries = audit.entries_for(ResourceKind::Product, id).await.unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].kind, EntryKind::Modification);
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let audit = services().await.audit;
        audit
            .record_batch(EntryKind::Deletion, ResourceKind::Order, &[], AccountId::SYSTEM)
            .await
            .unwrap();
    }
}
