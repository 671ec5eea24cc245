use editorial_types::{ArticleId, EditLock, EditorialError};
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// A conditional write lost against a concurrent writer
    #[error("conflict: {0}")]
    Conflict(String),

    /// A lock-guarded write found another holder's live lease
    #[error("article {} is locked by {}", .0.article_id, .0.holder_id)]
    LockHeld(EditLock),

    /// A lock-guarded write found no live lease for the writer
    #[error("lock lapsed: {0}")]
    LockLapsed(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Map onto the caller-facing taxonomy for an operation on `article_id`
    pub fn for_article(self, article_id: &ArticleId) -> EditorialError {
        match self {
            StorageError::NotFound(_) => EditorialError::NotFound(article_id.clone()),
            StorageError::Conflict(_) => EditorialError::StaleState(article_id.clone()),
            StorageError::InvalidInput(msg) => EditorialError::Validation(msg),
            StorageError::LockHeld(lock) => EditorialError::LockConflict {
                article_id: article_id.clone(),
                holder: lock.holder_id,
                expires_at: lock.expires_at,
            },
            StorageError::LockLapsed(_) => EditorialError::LockExpired(article_id.clone()),
            other => EditorialError::Storage(other.to_string()),
        }
    }
}

impl From<StorageError> for EditorialError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput(msg) => EditorialError::Validation(msg),
            other => EditorialError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use editorial_types::UserId;

    #[test]
    fn test_backend_errors_keep_their_message() {
        let id = ArticleId::new("a1");
        assert_eq!(
            StorageError::Backend("disk full".to_string()).for_article(&id),
            EditorialError::Storage("backend error: disk full".to_string())
        );
        assert_eq!(
            EditorialError::from(StorageError::InvariantViolation("two open rows".to_string())),
            EditorialError::Storage("invariant violation: two open rows".to_string())
        );
    }

    #[test]
    fn test_lock_guard_failures_map_to_lock_errors() {
        let id = ArticleId::new("a1");
        let expires_at = Utc::now();
        let held = StorageError::LockHeld(EditLock {
            article_id: id.clone(),
            holder_id: UserId::new("u2"),
            acquired_at: expires_at,
            expires_at,
        });
        assert_eq!(
            held.for_article(&id),
            EditorialError::LockConflict {
                article_id: id.clone(),
                holder: UserId::new("u2"),
                expires_at,
            }
        );
        assert_eq!(
            StorageError::LockLapsed("gone".to_string()).for_article(&id),
            EditorialError::LockExpired(id)
        );
    }
}
