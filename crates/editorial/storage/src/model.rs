use chrono::{DateTime, Utc};
use editorial_types::{
    Article, ArticleId, ArticleStatus, EditLock, ReviewDecision, ReviewLevel, UserId,
};
use serde::{Deserialize, Serialize};

use crate::{StorageError, StorageResult};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// A reviewer decision written together with a status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionWrite {
    pub level: ReviewLevel,
    pub reviewer: UserId,
    pub decision: ReviewDecision,
    pub comment: Option<String>,
}

/// One atomic workflow write.
///
/// Applied only if the article is still at `expected_status` and
/// `expected_version`; otherwise the whole commit fails with
/// [`crate::StorageError::Conflict`] and nothing is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    pub article_id: ArticleId,
    pub expected_status: ArticleStatus,
    pub expected_version: u64,
    pub to: ArticleStatus,
    /// Advance `review_cycle` before any ledger write
    pub starts_cycle: bool,
    /// Fill the current cycle's pending entry at this level, or append a
    /// decided row when none is open
    pub decision: Option<DecisionWrite>,
    /// Open a pending placeholder at this level in the (new) current cycle
    pub open_stage: Option<ReviewLevel>,
    /// Delete the article's lock row, whoever holds it
    pub release_lock: bool,
    pub at: DateTime<Utc>,
}

impl TransitionCommit {
    /// The article as it looks once this commit applies
    pub fn apply_to(&self, article: &Article) -> Article {
        let mut next = article.clone();
        next.status = self.to;
        next.version = article.version + 1;
        if self.starts_cycle {
            next.review_cycle = article.review_cycle + 1;
        }
        if self.to == ArticleStatus::Published {
            next.published_at = Some(self.at);
        }
        next.updated_at = self.at;
        next
    }
}

/// What a committed transition changed besides the article row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub article: Article,
    /// The lock row `release_lock` deleted, whether or not it was still live
    pub released_lock: Option<EditLock>,
}

/// Lease condition attached to a content write.
///
/// The write applies only if `holder` owns the article's lock and the lease
/// is live at `now`, checked against the same snapshot the write lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditGuard {
    pub holder: UserId,
    pub now: DateTime<Utc>,
}

impl EditGuard {
    pub fn new(holder: UserId, now: DateTime<Utc>) -> Self {
        Self { holder, now }
    }

    /// Check the article's current lock row against this guard
    pub fn check(&self, article_id: &ArticleId, lock: Option<&EditLock>) -> StorageResult<()> {
        match lock {
            Some(lock) if lock.is_live(self.now) && lock.holder_id == self.holder => Ok(()),
            Some(lock) if lock.is_live(self.now) => Err(StorageError::LockHeld(lock.clone())),
            _ => Err(StorageError::LockLapsed(format!(
                "{} holds no live lock on article {}",
                self.holder, article_id
            ))),
        }
    }
}

/// Outcome of a conditional lock acquire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAcquisition {
    /// No live lock existed; a new lease was written
    Acquired(EditLock),
    /// The caller already held the live lock; its lease was extended
    Refreshed(EditLock),
    /// Someone else holds the live lock; nothing was written
    Held(EditLock),
}

/// Outcome of a conditional lock renew
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockRenewal {
    Renewed(EditLock),
    /// A different holder has the live lock
    HeldByOther(EditLock),
    /// No live lock exists for the caller any more
    Lapsed,
}
