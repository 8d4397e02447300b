//! Order route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Map, Value};
use storehouse_core::OrderId;

use super::{ApiJson, JsonResult, PageQuery, Paged, parse_id};
use crate::error::AppError;
use crate::middleware::auth::{RequireStaff, RequireUser};
use crate::models::{Order, OrderCreate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
        .route("/{id}/cancel", post(cancel))
}

/// Every order, newest first.
///
/// # Errors
///
/// 401 for non-staff callers.
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Query(query): Query<PageQuery>,
) -> JsonResult<Paged<Order>> {
    let orders = &state.services().orders;
    let hits = orders.total_count().await?;
    let data = orders.fetch(query.limit(), query.page()).await?;
    Ok(Json(Paged::new(hits, query.limit(), data)))
}

/// Place an order for the caller.
///
/// # Errors
///
/// 400 for non-positive amounts or negative prices.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(create): ApiJson<OrderCreate>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state
        .services()
        .orders
        .create(user.account_id(), create)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// # Errors
///
/// 401 unless the caller owns the order or is staff.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> JsonResult<Order> {
    let id: OrderId = parse_id(&id)?;
    Ok(Json(state.services().orders.fetch_by_id(&user, id).await?))
}

/// Patch an order; the total is recomputed.
///
/// # Errors
///
/// 400 for a malformed document or a forbidden status change.
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<Map<String, Value>>,
) -> Result<StatusCode, AppError> {
    let id: OrderId = parse_id(&id)?;
    state
        .services()
        .orders
        .modify(staff.account_id(), id, &changes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// 400 when the order is already completed or canceled.
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: OrderId = parse_id(&id)?;
    state.services().orders.cancel(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// 404 for a missing order.
pub async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: OrderId = parse_id(&id)?;
    state.services().orders.remove(staff.account_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
