//! Product route handlers.
//!
//! Reads are public; changes need staff.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Map, Value};
use storehouse_core::ProductId;

use super::{ApiJson, JsonResult, PageQuery, Paged, parse_id};
use crate::error::AppError;
use crate::middleware::auth::RequireStaff;
use crate::models::{Product, ProductCreate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
}

/// # Errors
///
/// Returns an error if the catalogue cannot be read.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> JsonResult<Paged<Product>> {
    let products = &state.services().products;
    let hits = products.total_count().await?;
    let data = products.fetch(query.limit(), query.page()).await?;
    Ok(Json(Paged::new(hits, query.limit(), data)))
}

/// # Errors
///
/// 404 for a missing or removed product.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> JsonResult<Product> {
    let id: ProductId = parse_id(&id)?;
    Ok(Json(state.services().products.fetch_by_id(id).await?))
}

/// # Errors
///
/// 400 for an empty name or negative price.
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    ApiJson(create): ApiJson<ProductCreate>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state
        .services()
        .products
        .create(staff.account_id(), create)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// # Errors
///
/// 400 for a malformed document, 404 for a missing product.
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<Map<String, Value>>,
) -> JsonResult<Product> {
    let id: ProductId = parse_id(&id)?;
    let product = state
        .services()
        .products
        .modify(staff.account_id(), id, &changes)
        .await?;
    Ok(Json(product))
}

/// # Errors
///
/// 404 for a missing product.
pub async fn remove(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: ProductId = parse_id(&id)?;
    state.services().products.remove(staff.account_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
