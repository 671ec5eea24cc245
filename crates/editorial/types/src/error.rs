//! Error taxonomy for editorial operations
//!
//! Every variant is terminal for the call that produced it. Nothing in the
//! core retries; the caller decides whether to re-read state and try again.

use crate::{ArticleId, ArticleStatus, UserId, WorkflowAction};
use chrono::{DateTime, Utc};

/// Errors surfaced by editorial operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorialError {
    /// Caller rank or authorship is insufficient for the request
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// The action is not defined from the article's current status
    #[error("Invalid transition: cannot {action} an article in status {status}")]
    InvalidTransition {
        status: ArticleStatus,
        action: WorkflowAction,
    },

    /// Another holder has a live lock on the article
    #[error("Article {article_id} is locked by {holder} until {expires_at}")]
    LockConflict {
        article_id: ArticleId,
        holder: UserId,
        expires_at: DateTime<Utc>,
    },

    /// The caller's lease lapsed; stop editing and re-acquire
    #[error("Edit lock on article {0} has expired")]
    LockExpired(ArticleId),

    /// Published articles are immutable until unpublished
    #[error("Article {0} is published; unpublish to edit")]
    PublishedReadOnly(ArticleId),

    /// Rejected articles go back to draft before any content edit
    #[error("Article {0} was rejected; reopen it as a draft to edit")]
    RejectedReadOnly(ArticleId),

    /// A concurrent writer changed the article first
    #[error("Article {0} was modified concurrently; re-read and retry")]
    StaleState(ArticleId),

    /// Articles under review can only be edited by the live lock holder
    #[error("Article {0} is under review; acquire the edit lock first")]
    LockRequired(ArticleId),

    #[error("Article not found: {0}")]
    NotFound(ArticleId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EditorialError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EditorialError::Authorization(_) => "AUTHORIZATION",
            EditorialError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EditorialError::LockConflict { .. } => "LOCK_CONFLICT",
            EditorialError::LockExpired(_) => "LOCK_EXPIRED",
            EditorialError::PublishedReadOnly(_) => "PUBLISHED_READ_ONLY",
            EditorialError::RejectedReadOnly(_) => "REJECTED_READ_ONLY",
            EditorialError::StaleState(_) => "STALE_STATE",
            EditorialError::LockRequired(_) => "LOCK_REQUIRED",
            EditorialError::NotFound(_) => "NOT_FOUND",
            EditorialError::Validation(_) => "VALIDATION_ERROR",
            EditorialError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Result type alias for editorial operations
pub type EditorialResult<T> = Result<T, EditorialError>;
