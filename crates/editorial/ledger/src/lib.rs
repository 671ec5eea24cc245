//! Reviewer ledger - who decided what, at which stage, in which cycle.
//!
//! The ledger is a read facade over `editorial-storage`. Rows are written
//! only by `WorkflowStore::commit_transition`, in the same atomic write as
//! the status change they justify, so this crate never mutates anything.
//!
//! Eligibility is stage-level: entering a stage opens one `PENDING`
//! placeholder for its review level, and any caller of sufficient rank may
//! fill it. A new submit starts a new cycle; older rows stay for audit.

#![deny(unsafe_code)]

use editorial_storage::memory::InMemoryEditorialStore;
use editorial_storage::{EditorialStore, QueryWindow};
use editorial_types::{
    ArticleId, ArticleStatus, EditorialError, EditorialResult, ReviewDecision, ReviewLevel,
    ReviewerEntry,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A reviewer inbox row: an open placeholder plus enough of its article to
/// render a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReview {
    pub entry: ReviewerEntry,
    pub title: String,
    pub status: ArticleStatus,
}

/// The reviewer ledger facade.
pub struct ReviewerLedger {
    storage: Arc<dyn EditorialStore>,
}

impl ReviewerLedger {
    /// Create a ledger backed by in-memory storage.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(InMemoryEditorialStore::new()),
        }
    }

    /// Create a ledger backed by an explicit storage adapter.
    pub fn with_storage(storage: Arc<dyn EditorialStore>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> Arc<dyn EditorialStore> {
        Arc::clone(&self.storage)
    }

    /// Every ledger row of an article, ordered by cycle then level.
    pub async fn history(&self, article_id: &ArticleId) -> EditorialResult<Vec<ReviewerEntry>> {
        self.require_article(article_id).await?;
        self.storage
            .list_reviews(article_id)
            .await
            .map_err(|e| e.for_article(article_id))
    }

    /// Rows of the article's current review cycle only.
    pub async fn current_cycle(
        &self,
        article_id: &ArticleId,
    ) -> EditorialResult<Vec<ReviewerEntry>> {
        let cycle = self.require_article(article_id).await?;
        let entries = self
            .storage
            .list_reviews(article_id)
            .await
            .map_err(|e| e.for_article(article_id))?;
        Ok(entries.into_iter().filter(|e| e.is_active(cycle)).collect())
    }

    /// The latest decision recorded at `level` in the current cycle, if the
    /// stage has been reached.
    pub async fn stage_decision(
        &self,
        article_id: &ArticleId,
        level: ReviewLevel,
    ) -> EditorialResult<Option<ReviewDecision>> {
        Ok(self
            .current_cycle(article_id)
            .await?
            .into_iter()
            .filter(|e| e.review_level == level)
            .last()
            .map(|e| e.decision))
    }

    /// Open placeholders awaiting a decision at `level`, oldest first.
    pub async fn pending_for(
        &self,
        level: ReviewLevel,
        window: QueryWindow,
    ) -> EditorialResult<Vec<PendingReview>> {
        let entries = self
            .storage
            .list_pending_reviews(level, window)
            .await
            .map_err(EditorialError::from)?;

        let mut inbox = Vec::with_capacity(entries.len());
        for entry in entries {
            let article = self
                .storage
                .get_article(&entry.article_id)
                .await
                .map_err(|e| e.for_article(&entry.article_id))?;
            match article {
                Some(article) => inbox.push(PendingReview {
                    title: article.title,
                    status: article.status,
                    entry,
                }),
                None => {
                    tracing::warn!(
                        article_id = %entry.article_id,
                        entry_id = %entry.entry_id,
                        "pending review references a missing article"
                    );
                }
            }
        }
        Ok(inbox)
    }

    async fn require_article(&self, article_id: &ArticleId) -> EditorialResult<u32> {
        match self
            .storage
            .get_article(article_id)
            .await
            .map_err(|e| e.for_article(article_id))?
        {
            Some(article) if !article.is_deleted() => Ok(article.review_cycle),
            _ => Err(EditorialError::NotFound(article_id.clone())),
        }
    }
}

impl Default for ReviewerLedger {
    fn default() -> Self {
        Self::new()
    }
}
