//! Product repository.

use storehouse_core::ProductId;

use super::{Db, Params, Record, RepositoryError, Statement, affected};
use crate::models::Product;

const TABLE: &str = "products";

#[derive(Debug, Clone)]
pub struct ProductRepository {
    db: Db,
    count: Statement,
    select: Statement,
    select_by_id: Statement,
    insert: Statement,
    update: Statement,
    delete: Statement,
}

impl ProductRepository {
    /// Prepare every product statement.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error for the first statement the
    /// server rejects.
    pub async fn new(db: Db) -> Result<Self, RepositoryError> {
        let sb = db.statements();
        Ok(Self {
            count: db.prepare(sb.select_expr(TABLE, "COUNT(*)", "")).await?,
            select: db.prepare(sb.select_page::<Product>(TABLE, "")).await?,
            select_by_id: db.prepare(sb.select::<Product>(TABLE, "id = :id")).await?,
            insert: db.prepare(sb.insert_from_record::<Product>(TABLE)).await?,
            update: db
                .prepare(sb.update_from_record::<Product>(TABLE, "id = :id"))
                .await?,
            delete: db.prepare(sb.soft_delete(TABLE, "id = :id")).await?,
            db,
        })
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        self.db.fetch_scalar(&self.count, &Params::new()).await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn select(&self, limit: i64, page: i64) -> Result<Vec<Product>, RepositoryError> {
        self.db.fetch_all(&self.select, &Params::page(limit, page)).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no live product has `id`.
    pub async fn select_by_id(&self, id: ProductId) -> Result<Product, RepositoryError> {
        self.db
            .fetch_one(&self.select_by_id, &Params::new().with("id", id))
            .await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn insert(&self, product: &Product) -> Result<Product, RepositoryError> {
        let id = self
            .db
            .insert_returning_id(&self.insert, &product.to_params())
            .await?;
        self.select_by_id(ProductId::new(id)).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the product is gone.
    pub async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let params = product.to_params().with("id", product.id());
        affected(self.db.execute(&self.update, &params).await?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the product is already gone.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        affected(self.db.execute(&self.delete, &Params::new().with("id", id)).await?)?;
        Ok(())
    }
}
