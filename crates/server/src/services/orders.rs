//! Order use-cases and lifecycle enforcement.

use serde_json::{Map, Value as Json};
use storehouse_core::{AccountId, OrderId, OrderStatus, ResourceKind};
use tracing::{info, instrument};

use super::audit::{AuditResource, AuditService};
use super::{ServiceError, UserSession, authorize_owner, clamp_page};
use crate::db::OrderRepository;
use crate::models::{LineItem, Order, OrderCreate};
use crate::patch::patch;

#[derive(Debug, Clone)]
pub struct OrderService {
    repo: OrderRepository,
    audit: AuditResource,
}

impl OrderService {
    #[must_use]
    pub fn new(repo: OrderRepository, audit: &AuditService) -> Self {
        Self {
            repo,
            audit: audit.resource(ResourceKind::Order),
        }
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn total_count(&self) -> Result<i64, ServiceError> {
        Ok(self.repo.count().await?)
    }

    /// A page of all orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch(&self, limit: i64, page: i64) -> Result<Vec<Order>, ServiceError> {
        let (limit, page) = clamp_page(limit, page);
        Ok(self.repo.select(limit, page).await?)
    }

    /// A page of one account's orders; a `limit` of 0 returns all of them.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn fetch_by_account(
        &self,
        account_id: AccountId,
        limit: i64,
        page: i64,
    ) -> Result<Vec<Order>, ServiceError> {
        let (limit, page) = clamp_page(limit, page);
        Ok(self.repo.select_by_account(account_id, limit, page).await?)
    }

    /// Place an order for `account_id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::BadRequest` for non-positive amounts or negative
    /// prices, or the storage error.
    #[instrument(skip_all, fields(account_id = %account_id))]
    pub async fn create(
        &self,
        account_id: AccountId,
        create: OrderCreate,
    ) -> Result<Order, ServiceError> {
        validate(&create.products, create.shipping_price)?;
        let order = self.repo.insert(&create.into_order(account_id)).await?;
        self.audit.creation(account_id, order.id()).await?;
        info!(order_id = %order.id(), total = order.total, "order created");
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller owns the order
    /// or is staff.
    pub async fn fetch_by_id(
        &self,
        user: &UserSession,
        id: OrderId,
    ) -> Result<Order, ServiceError> {
        authorize_owner(user, self.repo.select_owner(id).await?)?;
        Ok(self.repo.select_by_id(id).await?)
    }

    /// Apply a patch document, recompute the total, and store the result.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Patch` for a malformed document and
    /// `ServiceError::BadRequest` for a status change the lifecycle forbids or
    /// for line items and shipping that `create` would reject.
    #[instrument(skip_all, fields(executor = %executor, order_id = %id))]
    pub async fn modify(
        &self,
        executor: AccountId,
        id: OrderId,
        changes: &Map<String, Json>,
    ) -> Result<Order, ServiceError> {
        let mut order = self.repo.select_by_id(id).await?;
        let previous = order.status;
        patch(&mut order, changes)?;
        if !previous.can_transition_to(order.status) {
            return Err(ServiceError::bad_request(format!(
                "order cannot move from {previous} to {}",
                order.status
            )));
        }
        validate(&order.products, order.shipping_price)?;
        order.update_total();
        self.repo.update(&order).await?;
        self.audit.modification(executor, id).await?;
        info!(status = %order.status, total = order.total, "order modified");
        Ok(order)
    }

    /// Cancel one order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller owns the order or
    /// is staff, and `ServiceError::BadRequest` if it is already completed or
    /// canceled.
    #[instrument(skip_all, fields(executor = %user.account_id(), order_id = %id))]
    pub async fn cancel(&self, user: &UserSession, id: OrderId) -> Result<(), ServiceError> {
        authorize_owner(user, self.repo.select_owner(id).await?)?;
        let order = self.repo.select_by_id(id).await?;
        if order.status.is_terminal() {
            return Err(ServiceError::bad_request(format!(
                "order is already {}",
                order.status
            )));
        }
        self.repo.update_status(id, OrderStatus::Canceled).await?;
        self.audit.modification(user.account_id(), id).await?;
        info!("order canceled");
        Ok(())
    }

    /// Cancel every open order of `account_id` in one batch.
    ///
    /// # Errors
    ///
    /// Returns the storage error; no order is changed on failure.
    #[instrument(skip_all, fields(executor = %executor, account_id = %account_id))]
    pub async fn cancel_by_account(
        &self,
        executor: AccountId,
        account_id: AccountId,
    ) -> Result<usize, ServiceError> {
        let ids: Vec<OrderId> = self
            .repo
            .select_open_by_account(account_id)
            .await?
            .iter()
            .map(Order::id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.repo
            .batch_update_status(&ids, OrderStatus::Canceled)
            .await?;
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        self.audit.batch_modification(executor, &raw).await?;
        info!(count = ids.len(), "open orders canceled");
        Ok(ids.len())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (wrapped) for a missing order.
    #[instrument(skip_all, fields(executor = %executor, order_id = %id))]
    pub async fn remove(&self, executor: AccountId, id: OrderId) -> Result<(), ServiceError> {
        self.repo.delete(id).await?;
        self.audit.deletion(executor, id).await?;
        info!("order removed");
        Ok(())
    }
}

/// Every line item needs a positive amount and no price may be negative.
fn validate(products: &[LineItem], shipping_price: f64) -> Result<(), ServiceError> {
    if products
        .iter()
        .any(|item| item.amount <= 0 || item.price < 0.0)
        || shipping_price < 0.0
    {
        return Err(ServiceError::bad_request(
            "amounts must be positive and prices not negative",
        ));
    }
    Ok(())
}
