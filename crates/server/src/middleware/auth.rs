//! Authentication extractors.
//!
//! The bearer token travels in `Authorization: Bearer <token>` or in the
//! `token` cookie. Each extractor resolves it through the account service
//! (which also slides the session expiry) and compares the account's level
//! against what the route requires.

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use storehouse_core::AuthLevel;

use crate::error::{AppError, set_sentry_user};
use crate::services::{ServiceError, UserSession};
use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Extractor that requires a signed-in user (or staff).
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.account.name)
/// }
/// ```
pub struct RequireUser(pub UserSession);

/// Extractor that requires a staff account.
pub struct RequireStaff(pub UserSession);

/// The raw token from the request, header first.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    from_header.or_else(|| cookie_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value handing `token` to the client.
#[must_use]
pub fn token_cookie(token: &str) -> String {
    format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// Resolve the caller and check they reach `required`.
async fn authorize(
    parts: &Parts,
    state: &AppState,
    required: AuthLevel,
) -> Result<UserSession, AppError> {
    let token = bearer_token(&parts.headers).ok_or(ServiceError::Unauthorized)?;
    let user = state.services().accounts.authenticate(token).await?;
    if !user.level().satisfies(required) {
        tracing::debug!(
            account_id = %user.account_id(),
            level = %user.level(),
            required = %required,
            "authorization level too low"
        );
        return Err(ServiceError::Unauthorized.into());
    }
    set_sentry_user(&user.account_id(), Some(&user.account.email));
    Ok(user)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, AuthLevel::User).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, AuthLevel::Staff).await.map(Self)
    }
}
