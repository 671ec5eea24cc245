//! Error types for editoriald

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use editorial_types::EditorialError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage backend could not be opened
    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Editorial(#[from] EditorialError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// No caller identity on the request
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Editorial(#[from] EditorialError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Editorial(err) => {
                let status = match err {
                    EditorialError::Authorization(_) => StatusCode::FORBIDDEN,
                    EditorialError::InvalidTransition { .. }
                    | EditorialError::PublishedReadOnly(_)
                    | EditorialError::RejectedReadOnly(_)
                    | EditorialError::StaleState(_) => StatusCode::CONFLICT,
                    EditorialError::LockConflict { .. } => StatusCode::LOCKED,
                    EditorialError::LockExpired(_) => StatusCode::GONE,
                    EditorialError::LockRequired(_) => StatusCode::PRECONDITION_REQUIRED,
                    EditorialError::NotFound(_) => StatusCode::NOT_FOUND,
                    EditorialError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    EditorialError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Editorial(EditorialError::LockConflict {
                article_id,
                holder,
                expires_at,
            }) => Some(serde_json::json!({
                "article_id": article_id,
                "holder": holder,
                "expires_at": expires_at,
            })),
            ApiError::Editorial(EditorialError::InvalidTransition { status, action }) => {
                Some(serde_json::json!({ "status": status, "action": action }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use editorial_types::{ArticleId, ArticleStatus, UserId, WorkflowAction};

    fn status_of(err: EditorialError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_editorial_error_status_codes() {
        let id = ArticleId::new("a1");
        assert_eq!(
            status_of(EditorialError::Authorization("no".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(EditorialError::InvalidTransition {
                status: ArticleStatus::Draft,
                action: WorkflowAction::Publish,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EditorialError::LockConflict {
                article_id: id.clone(),
                holder: UserId::new("u1"),
                expires_at: Utc::now(),
            }),
            StatusCode::LOCKED
        );
        assert_eq!(status_of(EditorialError::LockExpired(id.clone())), StatusCode::GONE);
        assert_eq!(
            status_of(EditorialError::PublishedReadOnly(id.clone())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EditorialError::RejectedReadOnly(id.clone())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EditorialError::LockRequired(id.clone())),
            StatusCode::PRECONDITION_REQUIRED
        );
        assert_eq!(status_of(EditorialError::NotFound(id)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_lock_conflict_names_holder() {
        let err = ApiError::from(EditorialError::LockConflict {
            article_id: ArticleId::new("a1"),
            holder: UserId::new("u1"),
            expires_at: Utc::now(),
        });
        let details = err.details().unwrap();
        assert_eq!(details["holder"], "u1");
    }

    #[test]
    fn test_unauthenticated_is_401() {
        let response = ApiError::Unauthenticated("missing x-caller-id".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
