//! Use-case services.
//!
//! # Services
//!
//! - `audit` - append-only ledger and per-resource facades
//! - `session` - token issue, sliding renewal, invalidation
//! - `accounts` - registration, login, profile and password changes, removal
//! - `orders` - order lifecycle
//! - `products` - catalogue maintenance
//! - `auth` - the password [`Hasher`] capability
//!
//! Every mutation is recorded in the audit ledger after the repository call
//! succeeds. A failed audit write fails the operation but does not undo the
//! mutation.

pub mod accounts;
pub mod audit;
pub mod auth;
pub mod orders;
pub mod products;
pub mod session;

use std::sync::Arc;

use storehouse_core::AccountId;
use thiserror::Error;

pub use accounts::AccountService;
pub use audit::{AuditResource, AuditService};
pub use auth::{Argon2Hasher, HashError, Hasher};
pub use orders::OrderService;
pub use products::ProductService;
pub use session::{SessionService, UserSession};

use crate::db::{
    AccountRepository, AuditRepository, Db, OrderRepository, ProductRepository, RepositoryError,
    SessionRepository,
};
use crate::patch::PatchError;

/// Largest page a listing returns.
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Errors returned by use-case operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Missing, invalid, or insufficient credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// The request is well-formed but not acceptable.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ServiceError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

/// Clamp listing parameters: `limit` into `0..=MAX_PAGE_LIMIT`, `page` to at least 1.
#[must_use]
pub fn clamp_page(limit: i64, page: i64) -> (i64, i64) {
    (limit.clamp(0, MAX_PAGE_LIMIT), page.max(1))
}

/// Only the owner of a resource and staff may touch it.
pub(crate) fn authorize_owner(user: &UserSession, owner: AccountId) -> Result<(), ServiceError> {
    if user.account_id() == owner || user.is_staff() {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

/// Every service, wired once at startup.
#[derive(Clone)]
pub struct Services {
    pub audit: AuditService,
    pub sessions: SessionService,
    pub accounts: AccountService,
    pub orders: OrderService,
    pub products: ProductService,
}

impl Services {
    /// Prepare every repository statement and build the services on top.
    ///
    /// # Errors
    ///
    /// Returns the translated storage error for the first statement the
    /// server rejects; the process must not serve traffic in that case.
    pub async fn new(
        db: Db,
        hasher: Arc<dyn Hasher>,
        session_window_minutes: i64,
    ) -> Result<Self, RepositoryError> {
        let audit = AuditService::new(AuditRepository::new(db.clone()).await?);
        let sessions = SessionService::new(
            SessionRepository::new(db.clone(), session_window_minutes).await?,
            &audit,
        );
        let orders = OrderService::new(OrderRepository::new(db.clone()).await?, &audit);
        let products = ProductService::new(ProductRepository::new(db.clone()).await?, &audit);
        let accounts = AccountService::new(
            AccountRepository::new(db).await?,
            sessions.clone(),
            orders.clone(),
            hasher,
            &audit,
        );
        Ok(Self {
            audit,
            sessions,
            accounts,
            orders,
            products,
        })
    }
}
