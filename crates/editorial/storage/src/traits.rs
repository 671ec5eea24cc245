use crate::model::{
    EditGuard, LockAcquisition, LockRenewal, QueryWindow, TransitionCommit, TransitionOutcome,
};
use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use editorial_types::{Article, ArticleId, ArticleStatus, EditLock, ReviewLevel, ReviewerEntry, UserId};

/// Storage interface for article rows.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article. Fails with `Conflict` if the id exists.
    async fn insert_article(&self, article: Article) -> StorageResult<()>;

    /// Get one article by id, including soft-deleted ones.
    async fn get_article(&self, article_id: &ArticleId) -> StorageResult<Option<Article>>;

    /// List live (not deleted) articles newest-first, optionally by status.
    async fn list_articles(
        &self,
        status: Option<ArticleStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Article>>;

    /// Replace non-workflow fields (content, contributors, deletion) if the
    /// stored version still equals `expected_version`. Status changes are
    /// rejected here; they go through [`WorkflowStore::commit_transition`].
    /// With a `guard`, the write also requires the guard's holder to own a
    /// live lock on the article, failing with `LockHeld` or `LockLapsed`.
    /// Returns the stored article with its version advanced.
    async fn update_article(
        &self,
        expected_version: u64,
        article: Article,
        guard: Option<EditGuard>,
    ) -> StorageResult<Article>;
}

/// Storage interface for atomic workflow transitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Apply status, ledger and lock effects together or not at all.
    async fn commit_transition(&self, commit: TransitionCommit)
        -> StorageResult<TransitionOutcome>;
}

/// Read interface for the reviewer ledger.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// All ledger rows of an article ordered by cycle, then level.
    async fn list_reviews(&self, article_id: &ArticleId) -> StorageResult<Vec<ReviewerEntry>>;

    /// Open placeholders awaiting a decision at `level`, oldest first.
    async fn list_pending_reviews(
        &self,
        level: ReviewLevel,
        window: QueryWindow,
    ) -> StorageResult<Vec<ReviewerEntry>>;
}

/// Storage interface for edit lock rows.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Write a lease unless a different holder is live at `now`.
    async fn try_acquire_lock(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<LockAcquisition>;

    /// Move `expires_at` forward iff `holder` is live at `now`.
    async fn renew_lock(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<LockRenewal>;

    /// Delete the row iff it belongs to `holder`. Returns whether a row went.
    async fn release_lock(&self, article_id: &ArticleId, holder: &UserId) -> StorageResult<bool>;

    /// The raw lock row, which may already be expired.
    async fn get_lock(&self, article_id: &ArticleId) -> StorageResult<Option<EditLock>>;
}

/// Unified storage bundle used by the coordinator.
pub trait EditorialStore: ArticleStore + WorkflowStore + ReviewStore + LockStore + Send + Sync {}

impl<T> EditorialStore for T where
    T: ArticleStore + WorkflowStore + ReviewStore + LockStore + Send + Sync
{
}
