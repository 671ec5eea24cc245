//! Edit lock records

use crate::{ArticleId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An exclusive, time-bounded edit lease on one article.
///
/// A row whose `expires_at` has passed is treated as absent by every
/// reader. Nothing sweeps expired rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLock {
    pub article_id: ArticleId,
    pub holder_id: UserId,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EditLock {
    pub fn new(
        article_id: ArticleId,
        holder_id: UserId,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Self {
        Self {
            article_id,
            holder_id,
            acquired_at: now,
            expires_at: now + lease,
        }
    }

    /// `now < expires_at`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_held_by(&self, user_id: &UserId, now: DateTime<Utc>) -> bool {
        self.is_live(now) && &self.holder_id == user_id
    }

    /// Time left on the lease, zero once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        if self.is_live(now) {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }
}

/// Read-only view of an article's lock from one caller's perspective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub article_id: ArticleId,
    pub locked: bool,
    pub holder: Option<UserId>,
    pub is_holder: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LockStatus {
    pub fn unlocked(article_id: ArticleId) -> Self {
        Self {
            article_id,
            locked: false,
            holder: None,
            is_holder: false,
            expires_at: None,
        }
    }

    pub fn from_lock(lock: &EditLock, caller: &UserId) -> Self {
        Self {
            article_id: lock.article_id.clone(),
            locked: true,
            holder: Some(lock.holder_id.clone()),
            is_holder: &lock.holder_id == caller,
            expires_at: Some(lock.expires_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_boundary() {
        let t0 = Utc::now();
        let lock = EditLock::new(
            ArticleId::new("a"),
            UserId::new("u1"),
            t0,
            Duration::seconds(60),
        );
        assert!(lock.is_live(t0 + Duration::seconds(59)));
        assert!(!lock.is_live(t0 + Duration::seconds(60)));
        assert_eq!(lock.remaining(t0 + Duration::seconds(90)), Duration::zero());
    }

    #[test]
    fn test_held_by_requires_liveness() {
        let t0 = Utc::now();
        let holder = UserId::new("u1");
        let lock = EditLock::new(ArticleId::new("a"), holder.clone(), t0, Duration::seconds(10));
        assert!(lock.is_held_by(&holder, t0));
        assert!(!lock.is_held_by(&holder, t0 + Duration::seconds(10)));
        assert!(!lock.is_held_by(&UserId::new("u2"), t0));
    }
}
