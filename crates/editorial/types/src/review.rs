//! Reviewer ledger rows

use crate::{ArticleId, EditorialError, EntryId, ReviewDecision, ReviewLevel, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the reviewer ledger.
///
/// Rows are opened as stage-level `PENDING` placeholders (no reviewer yet)
/// and become immutable once a decision is recorded. A new review cycle
/// appends fresh rows; rows of older cycles are kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerEntry {
    pub entry_id: EntryId,
    pub article_id: ArticleId,
    pub cycle: u32,
    pub review_level: ReviewLevel,
    pub user_id: Option<UserId>,
    pub decision: ReviewDecision,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl ReviewerEntry {
    /// Open a stage-level placeholder awaiting a decision
    pub fn placeholder(
        article_id: ArticleId,
        cycle: u32,
        review_level: ReviewLevel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: EntryId::generate(),
            article_id,
            cycle,
            review_level,
            user_id: None,
            decision: ReviewDecision::Pending,
            comment: None,
            created_at: now,
            decided_at: None,
        }
    }

    /// Fill in the decision. Fails if one was already recorded.
    pub fn decide(
        &mut self,
        reviewer: UserId,
        decision: ReviewDecision,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EditorialError> {
        if self.decision.is_final() {
            return Err(EditorialError::Validation(format!(
                "review {} already decided as {}",
                self.entry_id, self.decision
            )));
        }
        if !decision.is_final() {
            return Err(EditorialError::Validation(
                "a pending decision cannot be recorded".to_string(),
            ));
        }
        self.user_id = Some(reviewer);
        self.decision = decision;
        self.comment = comment;
        self.decided_at = Some(now);
        Ok(())
    }

    /// Whether this row belongs to the article's current cycle
    pub fn is_active(&self, current_cycle: u32) -> bool {
        self.cycle == current_cycle
    }

    pub fn is_pending(&self) -> bool {
        self.decision == ReviewDecision::Pending
    }
}
