//! Catalogue maintenance.

use serde_json::{Map, Value as Json};
use storehouse_core::{AccountId, ProductId, ResourceKind};
use tracing::{info, instrument};

use super::audit::{AuditResource, AuditService};
use super::{ServiceError, clamp_page};
use crate::db::ProductRepository;
use crate::models::{Product, ProductCreate};
use crate::patch::patch;

#[derive(Debug, Clone)]
pub struct ProductService {
    repo: ProductRepository,
    audit: AuditResource,
}

fn validate(product: &Product) -> Result<(), ServiceError> {
    if product.name.trim().is_empty() {
        return Err(ServiceError::bad_request("product name must not be empty"));
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(ServiceError::bad_request("product price must not be negative"));
    }
    Ok(())
}

impl ProductService {
    #[must_use]
    pub fn new(repo: ProductRepository, audit: &AuditService) -> Self {
        Self {
            repo,
            audit: audit.resource(ResourceKind::Product),
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::BadRequest` for an empty name or negative price.
    #[instrument(skip_all, fields(executor = %executor))]
    pub async fn create(
        &self,
        executor: AccountId,
        create: ProductCreate,
    ) -> Result<Product, ServiceError> {
        let product = Product::from(create);
        validate(&product)?;
        let product = self.repo.insert(&product).await?;
        self.audit.creation(executor, product.id()).await?;
        info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (wrapped) for a missing product.
    pub async fn fetch_by_id(&self, id: ProductId) -> Result<Product, ServiceError> {
        Ok(self.repo.select_by_id(id).await?)
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch(&self, limit: i64, page: i64) -> Result<Vec<Product>, ServiceError> {
        let (limit, page) = clamp_page(limit, page);
        Ok(self.repo.select(limit, page).await?)
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn total_count(&self) -> Result<i64, ServiceError> {
        Ok(self.repo.count().await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Patch` for a malformed document and
    /// `ServiceError::BadRequest` when the result is not a valid product.
    #[instrument(skip_all, fields(executor = %executor, product_id = %id))]
    pub async fn modify(
        &self,
        executor: AccountId,
        id: ProductId,
        changes: &Map<String, Json>,
    ) -> Result<Product, ServiceError> {
        let mut product = self.repo.select_by_id(id).await?;
        patch(&mut product, changes)?;
        validate(&product)?;
        self.repo.update(&product).await?;
        self.audit.modification(executor, id).await?;
        info!("product modified");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (wrapped) for a missing product.
    #[instrument(skip_all, fields(executor = %executor, product_id = %id))]
    pub async fn remove(&self, executor: AccountId, id: ProductId) -> Result<(), ServiceError> {
        self.repo.delete(id).await?;
        self.audit.deletion(executor, id).await?;
        info!("product removed");
        Ok(())
    }
}
