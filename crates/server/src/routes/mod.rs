//! JSON API route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database ping)
//!
//! # Accounts
//! POST   /api/account/register            - Create account, open session
//! POST   /api/account/login               - Open session
//! GET    /api/account/logout              - Close current session (user)
//! GET    /api/account/{id|@me}            - Account (self or staff)
//! PATCH  /api/account/{id}                - Patch profile (self or staff)
//! DELETE /api/account/{id}                - Remove account (self or staff)
//! GET    /api/account/{id}/orders         - Orders placed (self or staff)
//! POST   /api/account/{id}/password       - Change password (self or staff)
//! POST   /api/account/{id}/orders/cancel  - Cancel open orders (staff)
//!
//! # Orders
//! GET    /api/order                       - Paged listing (staff)
//! POST   /api/order                       - Place order (user)
//! GET    /api/order/{id}                  - Order (owner or staff)
//! PATCH  /api/order/{id}                  - Patch order (staff)
//! POST   /api/order/{id}/cancel           - Cancel (owner or staff)
//! DELETE /api/order/{id}                  - Remove (staff)
//!
//! # Products
//! GET    /api/product                     - Paged listing
//! GET    /api/product/{id}                - Product
//! POST   /api/product                     - Create (staff)
//! PATCH  /api/product/{id}                - Patch (staff)
//! DELETE /api/product/{id}                - Remove (staff)
//! ```

pub mod accounts;
pub mod orders;
pub mod products;

use axum::{
    Json, Router,
    extract::{FromRequest, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Page size used when the query does not give a usable one.
pub const DEFAULT_LIMIT: i64 = 10;

/// JSON body extractor whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `?limit=&page=`; anything unparsable falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    limit: Option<String>,
    page: Option<String>,
}

impl PageQuery {
    #[must_use]
    pub fn limit(&self) -> i64 {
        parse_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }

    #[must_use]
    pub fn page(&self) -> i64 {
        parse_or(self.page.as_deref(), 1)
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// One page of a listing plus the totals a client needs to page through it.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub hits: i64,
    pub pages: i64,
    pub data: Vec<T>,
}

impl<T> Paged<T> {
    #[must_use]
    pub fn new(hits: i64, limit: i64, data: Vec<T>) -> Self {
        Self {
            hits,
            pages: page_count(hits, limit),
            data,
        }
    }
}

/// `hits / limit`, rounded half to even; 0 for a zero limit.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn page_count(hits: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (hits as f64 / limit as f64).round_ties_even() as i64
}

/// Parse a numeric path segment into a typed id.
pub(crate) fn parse_id<T: From<i64>>(raw: &str) -> Result<T, AppError> {
    raw.parse::<i64>()
        .map(T::from)
        .map_err(|_| AppError::BadRequest(format!("invalid id '{raw}'")))
}

/// Liveness: the process is up.
async fn health() -> &'static str {
    "ok"
}

/// Readiness: the database answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.db().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Every API route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/account", accounts::router())
        .nest("/order", orders::router())
        .nest("/product", products::router())
}

/// The full application router with request tracing, ready to serve.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// `Json` shorthand for handlers that return a value.
pub type JsonResult<T> = Result<Json<T>, AppError>;
