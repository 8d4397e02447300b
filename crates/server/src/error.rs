//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are logged with
//! full detail and captured to Sentry; clients only see a status code and a
//! generic JSON message.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::patch::PatchError;
use crate::services::ServiceError;

/// Application-level error type for the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Malformed path, query, or body.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<RepositoryError> for AppError {
    fn from(error: RepositoryError) -> Self {
        Self::Service(ServiceError::Repository(error))
    }
}

impl From<PatchError> for AppError {
    fn from(error: PatchError) -> Self {
        Self::Service(ServiceError::Patch(error))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Service(err) => match err {
                ServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                ServiceError::Repository(RepositoryError::Duplicate) => StatusCode::CONFLICT,
                ServiceError::Repository(RepositoryError::NullConstraint)
                | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
                ServiceError::Patch(patch) if patch.is_client_error() => StatusCode::BAD_REQUEST,
                ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
                ServiceError::Repository(_) | ServiceError::Patch(_) | ServiceError::Hash(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::Service(ServiceError::BadRequest(msg)) => msg.clone(),
            Self::Service(ServiceError::Patch(patch)) if patch.is_client_error() => {
                patch.to_string()
            }
            Self::Service(ServiceError::Repository(RepositoryError::NotFound)) => {
                "Not found".to_owned()
            }
            Self::Service(ServiceError::Repository(RepositoryError::Duplicate)) => {
                "Resource already exists".to_owned()
            }
            Self::Service(ServiceError::Repository(RepositoryError::NullConstraint)) => {
                "Missing required value".to_owned()
            }
            Self::Service(ServiceError::Unauthorized) => "Unauthorized".to_owned(),
            Self::Service(_) => "Internal server error".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                error_debug = ?self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(status(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(RepositoryError::Duplicate), StatusCode::CONFLICT);
        assert_eq!(status(RepositoryError::NullConstraint), StatusCode::BAD_REQUEST);
        assert_eq!(status(ServiceError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(ServiceError::BadRequest("no".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AppError::BadRequest("bad json".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RepositoryError::DataCorruption("x".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_patch_errors_split_by_cause() {
        let mismatch = PatchError::TypeMismatch {
            field: "price",
            expected: "float",
            found: "string",
        };
        assert_eq!(status(mismatch), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(PatchError::InvalidTarget("base")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::from(RepositoryError::DataCorruption("column total: oops".to_owned()));
        assert_eq!(err.public_message(), "Internal server error");
        let err = AppError::from(RepositoryError::Duplicate);
        assert_eq!(err.public_message(), "Resource already exists");
    }
}
