//! Articles and authorship

use crate::{ArticleId, ArticleStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An article under editorial control.
///
/// `status` and `version` are only ever changed through conditional writes
/// in the store; `version` increments on every accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub status: ArticleStatus,
    pub owner_id: UserId,
    pub contributor_ids: Vec<UserId>,
    pub title: String,
    pub body: String,
    pub version: u64,
    /// Incremented by every submit. Ledger rows from older cycles are superseded.
    pub review_cycle: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Article {
    /// A fresh draft owned by `owner_id`
    pub fn draft(
        owner_id: UserId,
        title: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ArticleId::generate(),
            status: ArticleStatus::Draft,
            owner_id,
            contributor_ids: Vec::new(),
            title: title.into(),
            body: body.into(),
            version: 1,
            review_cycle: 0,
            created_at: now,
            updated_at: now,
            published_at: None,
            deleted_at: None,
        }
    }

    pub fn with_id(mut self, id: ArticleId) -> Self {
        self.id = id;
        self
    }

    pub fn with_contributor(mut self, user_id: UserId) -> Self {
        if user_id != self.owner_id && !self.contributor_ids.contains(&user_id) {
            self.contributor_ids.push(user_id);
        }
        self
    }

    /// How `user_id` relates to this article
    pub fn authorship(&self, user_id: &UserId) -> Authorship {
        if &self.owner_id == user_id {
            Authorship::Owner
        } else if self.contributor_ids.contains(user_id) {
            Authorship::Contributor
        } else {
            Authorship::None
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A caller's authorship relation to an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorship {
    Owner,
    Contributor,
    None,
}

impl Authorship {
    pub const fn is_author(self) -> bool {
        matches!(self, Authorship::Owner | Authorship::Contributor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let article = Article::draft(UserId::new("owner"), "Open day", "...", Utc::now());
        assert_eq!(article.status, ArticleStatus::Draft);
        assert_eq!(article.version, 1);
        assert_eq!(article.review_cycle, 0);
        assert!(!article.is_deleted());
    }

    #[test]
    fn test_authorship() {
        let article = Article::draft(UserId::new("owner"), "t", "b", Utc::now())
            .with_contributor(UserId::new("co"))
            .with_contributor(UserId::new("owner"));

        assert_eq!(article.authorship(&UserId::new("owner")), Authorship::Owner);
        assert_eq!(article.authorship(&UserId::new("co")), Authorship::Contributor);
        assert_eq!(article.authorship(&UserId::new("x")), Authorship::None);
        assert_eq!(article.contributor_ids.len(), 1);
    }
}
