//! Account route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storehouse_core::AccountId;

use super::{ApiJson, JsonResult, PageQuery, parse_id};
use crate::error::{AppError, clear_sentry_user};
use crate::middleware::auth::{RequireStaff, RequireUser, token_cookie};
use crate::models::{Account, AccountCreate, AccountLogin, Order, Session};
use crate::services::UserSession;
use crate::state::AppState;

/// Path alias for the caller's own account.
pub const SELF_ALIAS: &str = "@me";

const EXPIRED_COOKIE: &str = "token=; Path=/; Max-Age=0";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/{id}", get(show).patch(update).delete(remove))
        .route("/{id}/orders", get(orders))
        .route("/{id}/orders/cancel", post(cancel_orders))
        .route("/{id}/password", post(change_password))
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: AccountId,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub password: String,
}

fn account_id(raw: &str, user: &UserSession) -> Result<AccountId, AppError> {
    if raw == SELF_ALIAS {
        Ok(user.account_id())
    } else {
        parse_id(raw)
    }
}

/// JSON `{id, token}` plus the token cookie.
fn session_response(status: StatusCode, account: &Account, session: Session) -> Response {
    let cookie = HeaderValue::from_str(&token_cookie(&session.token));
    let body = Json(SessionResponse {
        id: account.id(),
        token: session.token,
    });
    match cookie {
        Ok(cookie) => (status, [(SET_COOKIE, cookie)], body).into_response(),
        Err(_) => (status, body).into_response(),
    }
}

/// Create a user account and sign it in.
///
/// # Errors
///
/// 400 for an invalid email or weak password, 409 when the email is taken.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(create): ApiJson<AccountCreate>,
) -> Result<Response, AppError> {
    let (account, session) = state.services().accounts.register(create).await?;
    Ok(session_response(StatusCode::CREATED, &account, session))
}

/// # Errors
///
/// 401 for unknown credentials.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(login): ApiJson<AccountLogin>,
) -> Result<Response, AppError> {
    let (account, session) = state.services().accounts.login(login).await?;
    Ok(session_response(StatusCode::OK, &account, session))
}

/// End the current session and drop the cookie.
///
/// # Errors
///
/// Returns an error if the session cannot be invalidated.
pub async fn logout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Response, AppError> {
    state.services().accounts.logout(&user).await?;
    clear_sentry_user();
    let expired = HeaderValue::from_static(EXPIRED_COOKIE);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, expired)]).into_response())
}

/// # Errors
///
/// 401 unless the caller is the account or staff, 404 when it is gone.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> JsonResult<Account> {
    let id = account_id(&id, &user)?;
    Ok(Json(state.services().accounts.fetch_by_id(&user, id).await?))
}

/// Patch email, name, or surname.
///
/// # Errors
///
/// 400 for a malformed document or invalid email, 409 for a taken email.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<Map<String, Value>>,
) -> JsonResult<Account> {
    let id = account_id(&id, &user)?;
    Ok(Json(state.services().accounts.modify(&user, id, &changes).await?))
}

/// # Errors
///
/// 401 unless the caller is the account or staff.
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = account_id(&id, &user)?;
    state.services().accounts.remove(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Orders placed by the account; `?limit=0` returns them all.
///
/// # Errors
///
/// 401 unless the caller is the account or staff.
pub async fn orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> JsonResult<Vec<Order>> {
    let id = account_id(&id, &user)?;
    let orders = state
        .services()
        .accounts
        .fetch_orders(&user, id, query.limit(), query.page())
        .await?;
    Ok(Json(orders))
}

/// # Errors
///
/// 400 for a weak password, 401 unless the caller is the account or staff.
pub async fn change_password(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<PasswordChange>,
) -> Result<StatusCode, AppError> {
    let id = account_id(&id, &user)?;
    state
        .services()
        .accounts
        .modify_password(&user, id, &change.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel every open order of the account.
///
/// # Errors
///
/// 401 for non-staff callers.
pub async fn cancel_orders(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = account_id(&id, &staff)?;
    let canceled = state
        .services()
        .orders
        .cancel_by_account(staff.account_id(), id)
        .await?;
    tracing::info!(account_id = %id, canceled, "open orders canceled by staff");
    Ok(StatusCode::NO_CONTENT)
}
