//! Order repository.

use storehouse_core::{AccountId, OrderId, OrderStatus};

use super::{Db, Params, Record, RepositoryError, Statement, affected};
use crate::models::Order;

const TABLE: &str = "orders";

#[derive(Debug, Clone)]
pub struct OrderRepository {
    db: Db,
    count: Statement,
    select: Statement,
    select_by_account: Statement,
    select_all_by_account: Statement,
    select_by_id: Statement,
    select_owner: Statement,
    select_open_by_account: Statement,
    insert: Statement,
    update: Statement,
    update_status: Statement,
    delete: Statement,
}

impl OrderRepository {
    /// Prepare every order statement.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error for the first statement the
    /// server rejects.
    pub async fn new(db: Db) -> Result<Self, RepositoryError> {
        let sb = db.statements();
        let open: Vec<String> = OrderStatus::OPEN
            .iter()
            .map(|status| status.code().to_string())
            .collect();
        let open_predicate = format!("order_by = :order_by AND status IN ({})", open.join(", "));
        Ok(Self {
            count: db.prepare(sb.select_expr(TABLE, "COUNT(*)", "")).await?,
            select: db.prepare(sb.select_page::<Order>(TABLE, "")).await?,
            select_by_account: db
                .prepare(sb.select_page::<Order>(TABLE, "order_by = :order_by"))
                .await?,
            select_all_by_account: db
                .prepare(sb.select_with::<Order>(TABLE, "order_by = :order_by", "ORDER BY id DESC"))
                .await?,
            select_by_id: db.prepare(sb.select::<Order>(TABLE, "id = :id")).await?,
            select_owner: db.prepare(sb.select_expr(TABLE, "order_by", "id = :id")).await?,
            select_open_by_account: db
                .prepare(sb.select_with::<Order>(TABLE, &open_predicate, "ORDER BY id"))
                .await?,
            insert: db.prepare(sb.insert_from_record::<Order>(TABLE)).await?,
            update: db.prepare(sb.update_from_record::<Order>(TABLE, "id = :id")).await?,
            update_status: db
                .prepare(sb.update(TABLE, "status = :status", "id = :id"))
                .await?,
            delete: db.prepare(sb.soft_delete(TABLE, "id = :id")).await?,
            db,
        })
    }

    /// Number of live orders.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        self.db.fetch_scalar(&self.count, &Params::new()).await
    }

    /// Newest orders first.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn select(&self, limit: i64, page: i64) -> Result<Vec<Order>, RepositoryError> {
        self.db.fetch_all(&self.select, &Params::page(limit, page)).await
    }

    /// Orders placed by `account_id`, newest first; a `limit` of 0 returns all.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn select_by_account(
        &self,
        account_id: AccountId,
        limit: i64,
        page: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        if limit == 0 {
            let params = Params::new().with("order_by", account_id);
            return self.db.fetch_all(&self.select_all_by_account, &params).await;
        }
        let params = Params::page(limit, page).with("order_by", account_id);
        self.db.fetch_all(&self.select_by_account, &params).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no live order has `id`.
    pub async fn select_by_id(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.db
            .fetch_one(&self.select_by_id, &Params::new().with("id", id))
            .await
    }

    /// The account that placed the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no live order has `id`.
    pub async fn select_owner(&self, id: OrderId) -> Result<AccountId, RepositoryError> {
        self.db
            .fetch_scalar(&self.select_owner, &Params::new().with("id", id))
            .await
            .map(AccountId::new)
    }

    /// Orders of `account_id` that can still be canceled.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn select_open_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.db
            .fetch_all(
                &self.select_open_by_account,
                &Params::new().with("order_by", account_id),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns the translated storage error.
    pub async fn insert(&self, order: &Order) -> Result<Order, RepositoryError> {
        let id = self
            .db
            .insert_returning_id(&self.insert, &order.to_params())
            .await?;
        self.select_by_id(OrderId::new(id)).await
    }

    /// Write every column of `order`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the order is gone.
    pub async fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let params = order.to_params().with("id", order.id());
        affected(self.db.execute(&self.update, &params).await?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the order is gone.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let params = Params::new().with("status", status).with("id", id);
        affected(self.db.execute(&self.update_status, &params).await?)?;
        Ok(())
    }

    /// Set `status` on every order in `ids` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any order is gone; no order is
    /// changed in that case.
    pub async fn batch_update_status(
        &self,
        ids: &[OrderId],
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.db.begin().await?;
        let outcome = async {
            for id in ids {
                let params = Params::new().with("status", status).with("id", *id);
                affected(self.update_status.execute(tx.conn(), &params).await?)?;
            }
            Ok(())
        }
        .await;
        tx.finish(outcome).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the order is already gone.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        affected(self.db.execute(&self.delete, &Params::new().with("id", id)).await?)?;
        Ok(())
    }
}
