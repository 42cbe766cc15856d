use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::domain::{PostId, PostStatus};
use super::repository::{NotifyError, RepositoryError};

/// Stable machine-readable category for every marketplace failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    Unauthenticated,
    State,
    Conflict,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub const fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::State | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised by the lifecycle engine, review subsystem, and identity service.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authorization(String),
    #[error("missing acting user")]
    Unauthenticated,
    #[error("cannot {action} while post is {status}")]
    InvalidState {
        action: &'static str,
        status: PostStatus,
    },
    #[error("post {post_id} has expired")]
    Expired { post_id: PostId },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("misconfigured marketplace: {0}")]
    Configuration(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotifyError),
}

impl MarketplaceError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            MarketplaceError::Validation(_) => ErrorKind::Validation,
            MarketplaceError::Authorization(_) => ErrorKind::Authorization,
            MarketplaceError::Unauthenticated => ErrorKind::Unauthenticated,
            MarketplaceError::InvalidState { .. } | MarketplaceError::Expired { .. } => {
                ErrorKind::State
            }
            MarketplaceError::Conflict(_) => ErrorKind::Conflict,
            MarketplaceError::NotFound(_) => ErrorKind::NotFound,
            MarketplaceError::Configuration(_)
            | MarketplaceError::Repository(_)
            | MarketplaceError::Notification(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "marketplace request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": { "kind": kind, "message": message } }));
        (kind.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_failures_hide_details() {
        let error = MarketplaceError::from(RepositoryError::Unavailable(
            "connection refused at 10.0.0.4".to_string(),
        ));
        assert_eq!(error.kind(), ErrorKind::Internal);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn state_errors_describe_the_transition() {
        let error = MarketplaceError::InvalidState {
            action: "select a user",
            status: PostStatus::InProgress,
        };
        assert_eq!(error.kind(), ErrorKind::State);
        assert_eq!(
            error.to_string(),
            "cannot select a user while post is in_progress"
        );
    }
}
