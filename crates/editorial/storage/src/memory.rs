//! In-memory reference implementation of the editorial storage traits.
//!
//! All rows live behind one `RwLock` so a transition's status, ledger and
//! lock effects become visible together. Suitable for tests and
//! single-process deployments only.

use crate::model::{
    EditGuard, LockAcquisition, LockRenewal, QueryWindow, TransitionCommit, TransitionOutcome,
};
use crate::traits::{ArticleStore, LockStore, ReviewStore, WorkflowStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use editorial_types::{
    Article, ArticleId, ArticleStatus, EditLock, ReviewLevel, ReviewerEntry, UserId,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    articles: HashMap<ArticleId, Article>,
    reviews: Vec<ReviewerEntry>,
    locks: HashMap<ArticleId, EditLock>,
}

/// In-memory editorial storage adapter.
#[derive(Default)]
pub struct InMemoryEditorialStore {
    state: RwLock<State>,
}

impl InMemoryEditorialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StorageError::Backend("editorial state lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StorageError::Backend("editorial state lock poisoned".to_string()))
    }
}

#[async_trait]
impl ArticleStore for InMemoryEditorialStore {
    async fn insert_article(&self, article: Article) -> StorageResult<()> {
        let mut guard = self.write()?;
        if guard.articles.contains_key(&article.id) {
            return Err(StorageError::Conflict(format!(
                "article {} already exists",
                article.id
            )));
        }
        guard.articles.insert(article.id.clone(), article);
        Ok(())
    }

    async fn get_article(&self, article_id: &ArticleId) -> StorageResult<Option<Article>> {
        let guard = self.read()?;
        Ok(guard.articles.get(article_id).cloned())
    }

    async fn list_articles(
        &self,
        status: Option<ArticleStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Article>> {
        let guard = self.read()?;
        let mut values = guard
            .articles
            .values()
            .filter(|a| !a.is_deleted())
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(apply_window(values, window))
    }

    async fn update_article(
        &self,
        expected_version: u64,
        article: Article,
        edit_guard: Option<EditGuard>,
    ) -> StorageResult<Article> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let stored = state
            .articles
            .get_mut(&article.id)
            .ok_or_else(|| StorageError::NotFound(format!("article {} not found", article.id)))?;

        if stored.version != expected_version {
            return Err(StorageError::Conflict(format!(
                "article {} is at version {}, expected {}",
                article.id, stored.version, expected_version
            )));
        }
        if stored.status != article.status || stored.review_cycle != article.review_cycle {
            return Err(StorageError::InvalidInput(format!(
                "workflow fields of article {} change only through transitions",
                article.id
            )));
        }
        if let Some(edit_guard) = &edit_guard {
            edit_guard.check(&article.id, state.locks.get(&article.id))?;
        }

        let mut next = article;
        next.version = stored.version + 1;
        next.created_at = stored.created_at;
        next.published_at = stored.published_at;
        *stored = next.clone();
        Ok(next)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryEditorialStore {
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> StorageResult<TransitionOutcome> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let current = state.articles.get(&commit.article_id).ok_or_else(|| {
            StorageError::NotFound(format!("article {} not found", commit.article_id))
        })?;
        if current.status != commit.expected_status || current.version != commit.expected_version
        {
            return Err(StorageError::Conflict(format!(
                "article {} moved to {} (version {}) before {} could apply",
                commit.article_id, current.status, current.version, commit.to
            )));
        }

        let next = commit.apply_to(current);
        let cycle = next.review_cycle;

        // Stage every ledger change before touching state so a failed check
        // leaves nothing behind.
        let mut decided: Option<(usize, ReviewerEntry)> = None;
        let mut appended = Vec::new();
        if let Some(write) = &commit.decision {
            let existing = state.reviews.iter().position(|e| {
                e.article_id == commit.article_id
                    && e.cycle == cycle
                    && e.review_level == write.level
                    && e.is_pending()
            });
            match existing {
                Some(idx) => {
                    let mut entry = state.reviews[idx].clone();
                    entry
                        .decide(
                            write.reviewer.clone(),
                            write.decision,
                            write.comment.clone(),
                            commit.at,
                        )
                        .map_err(|err| StorageError::InvariantViolation(err.to_string()))?;
                    decided = Some((idx, entry));
                }
                None => {
                    let mut entry = ReviewerEntry::placeholder(
                        commit.article_id.clone(),
                        cycle,
                        write.level,
                        commit.at,
                    );
                    entry
                        .decide(
                            write.reviewer.clone(),
                            write.decision,
                            write.comment.clone(),
                            commit.at,
                        )
                        .map_err(|err| StorageError::InvariantViolation(err.to_string()))?;
                    appended.push(entry);
                }
            }
        }
        if let Some(level) = commit.open_stage {
            appended.push(ReviewerEntry::placeholder(
                commit.article_id.clone(),
                cycle,
                level,
                commit.at,
            ));
        }

        if let Some((idx, entry)) = decided {
            state.reviews[idx] = entry;
        }
        state.reviews.extend(appended);
        let released_lock = if commit.release_lock {
            state.locks.remove(&commit.article_id)
        } else {
            None
        };
        state.articles.insert(next.id.clone(), next.clone());
        Ok(TransitionOutcome {
            article: next,
            released_lock,
        })
    }
}

#[async_trait]
impl ReviewStore for InMemoryEditorialStore {
    async fn list_reviews(&self, article_id: &ArticleId) -> StorageResult<Vec<ReviewerEntry>> {
        let guard = self.read()?;
        let mut values = guard
            .reviews
            .iter()
            .filter(|e| &e.article_id == article_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| {
            a.cycle
                .cmp(&b.cycle)
                .then(a.review_level.cmp(&b.review_level))
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(values)
    }

    async fn list_pending_reviews(
        &self,
        level: ReviewLevel,
        window: QueryWindow,
    ) -> StorageResult<Vec<ReviewerEntry>> {
        let guard = self.read()?;
        let mut values = guard
            .reviews
            .iter()
            .filter(|e| e.review_level == level && e.is_pending())
            .filter(|e| {
                guard
                    .articles
                    .get(&e.article_id)
                    .is_some_and(|a| !a.is_deleted() && e.is_active(a.review_cycle))
            })
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(apply_window(values, window))
    }
}

#[async_trait]
impl LockStore for InMemoryEditorialStore {
    async fn try_acquire_lock(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<LockAcquisition> {
        let mut guard = self.write()?;
        match guard.locks.get_mut(article_id) {
            Some(lock) if lock.is_live(now) && &lock.holder_id != holder => {
                Ok(LockAcquisition::Held(lock.clone()))
            }
            Some(lock) if lock.is_live(now) => {
                lock.expires_at = expires_at;
                Ok(LockAcquisition::Refreshed(lock.clone()))
            }
            _ => {
                let lock = EditLock {
                    article_id: article_id.clone(),
                    holder_id: holder.clone(),
                    acquired_at: now,
                    expires_at,
                };
                guard.locks.insert(article_id.clone(), lock.clone());
                Ok(LockAcquisition::Acquired(lock))
            }
        }
    }

    async fn renew_lock(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<LockRenewal> {
        let mut guard = self.write()?;
        match guard.locks.get_mut(article_id) {
            Some(lock) if lock.is_live(now) && &lock.holder_id == holder => {
                lock.expires_at = expires_at;
                Ok(LockRenewal::Renewed(lock.clone()))
            }
            Some(lock) if lock.is_live(now) => Ok(LockRenewal::HeldByOther(lock.clone())),
            _ => Ok(LockRenewal::Lapsed),
        }
    }

    async fn release_lock(&self, article_id: &ArticleId, holder: &UserId) -> StorageResult<bool> {
        let mut guard = self.write()?;
        let owned = guard
            .locks
            .get(article_id)
            .is_some_and(|lock| &lock.holder_id == holder);
        if owned {
            guard.locks.remove(article_id);
        }
        Ok(owned)
    }

    async fn get_lock(&self, article_id: &ArticleId) -> StorageResult<Option<EditLock>> {
        let guard = self.read()?;
        Ok(guard.locks.get(article_id).cloned())
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DecisionWrite;
    use chrono::Duration;
    use editorial_types::ReviewDecision;

    fn draft(owner: &str) -> Article {
        Article::draft(UserId::new(owner), "Open day", "Campus tours at 10am", Utc::now())
    }

    fn submit(article: &Article) -> TransitionCommit {
        TransitionCommit {
            article_id: article.id.clone(),
            expected_status: ArticleStatus::Draft,
            expected_version: article.version,
            to: ArticleStatus::Pending,
            starts_cycle: true,
            decision: None,
            open_stage: Some(ReviewLevel::UnitEditor),
            release_lock: false,
            at: Utc::now(),
        }
    }

    fn approve(article: &Article, reviewer: &str) -> TransitionCommit {
        TransitionCommit {
            article_id: article.id.clone(),
            expected_status: ArticleStatus::Pending,
            expected_version: article.version,
            to: ArticleStatus::ApprovedByUnitEditor,
            starts_cycle: false,
            decision: Some(DecisionWrite {
                level: ReviewLevel::UnitEditor,
                reviewer: UserId::new(reviewer),
                decision: ReviewDecision::Approved,
                comment: Some("looks good".to_string()),
            }),
            open_stage: Some(ReviewLevel::UnitLeader),
            release_lock: true,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();
        let err = store.insert_article(article).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_requires_current_version() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();

        let mut edited = article.clone();
        edited.body = "Campus tours at 11am".to_string();
        let stored = store.update_article(1, edited.clone(), None).await.unwrap();
        assert_eq!(stored.version, 2);

        let err = store.update_article(1, edited, None).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_cannot_change_status() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();

        let mut sneaky = article;
        sneaky.status = ArticleStatus::Published;
        let err = store.update_article(1, sneaky, None).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn transition_applies_ledger_and_lock_together() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();

        let pending = store.commit_transition(submit(&article)).await.unwrap().article;
        assert_eq!(pending.status, ArticleStatus::Pending);
        assert_eq!(pending.review_cycle, 1);
        assert_eq!(pending.version, 2);

        let now = Utc::now();
        store
            .try_acquire_lock(&article.id, &UserId::new("ed"), now, now + Duration::seconds(120))
            .await
            .unwrap();

        let outcome = store.commit_transition(approve(&pending, "ed")).await.unwrap();
        assert_eq!(outcome.article.status, ArticleStatus::ApprovedByUnitEditor);
        assert_eq!(
            outcome.released_lock.map(|lock| lock.holder_id),
            Some(UserId::new("ed"))
        );
        assert!(store.get_lock(&article.id).await.unwrap().is_none());

        let reviews = store.list_reviews(&article.id).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].review_level, ReviewLevel::UnitEditor);
        assert_eq!(reviews[0].decision, ReviewDecision::Approved);
        assert_eq!(reviews[0].user_id, Some(UserId::new("ed")));
        assert_eq!(reviews[1].review_level, ReviewLevel::UnitLeader);
        assert!(reviews[1].is_pending());
    }

    #[tokio::test]
    async fn stale_transition_writes_nothing() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();
        let pending = store.commit_transition(submit(&article)).await.unwrap().article;

        store.commit_transition(approve(&pending, "ed-1")).await.unwrap();
        let err = store
            .commit_transition(approve(&pending, "ed-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let reviews = store.list_reviews(&article.id).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].user_id, Some(UserId::new("ed-1")));
    }

    #[tokio::test]
    async fn pending_queue_only_shows_current_cycle() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();
        let pending = store.commit_transition(submit(&article)).await.unwrap().article;

        let queue = store
            .list_pending_reviews(ReviewLevel::UnitEditor, QueryWindow::default())
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].cycle, 1);

        store.commit_transition(approve(&pending, "ed")).await.unwrap();
        let queue = store
            .list_pending_reviews(ReviewLevel::UnitEditor, QueryWindow::default())
            .await
            .unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn guarded_update_needs_the_writers_live_lease() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let t0 = Utc::now();

        let mut edited = article.clone();
        edited.body = "Campus tours at noon".to_string();

        let err = store
            .update_article(1, edited.clone(), Some(EditGuard::new(u1.clone(), t0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::LockLapsed(_)));

        store
            .try_acquire_lock(&article.id, &u1, t0, t0 + Duration::seconds(120))
            .await
            .unwrap();
        let stored = store
            .update_article(1, edited.clone(), Some(EditGuard::new(u1.clone(), t0)))
            .await
            .unwrap();
        assert_eq!(stored.version, 2);

        // u1's lease runs out and u2 takes over before u1 writes again
        let later = t0 + Duration::seconds(150);
        store
            .try_acquire_lock(&article.id, &u2, later, later + Duration::seconds(120))
            .await
            .unwrap();
        let err = store
            .update_article(2, edited.clone(), Some(EditGuard::new(u1.clone(), later)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::LockHeld(ref lock) if lock.holder_id == u2));
        assert!(matches!(
            err.for_article(&article.id),
            editorial_types::EditorialError::LockConflict { ref holder, .. } if *holder == u2
        ));
        assert_eq!(store.get_article(&article.id).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn decision_without_open_entry_appends_a_row() {
        let store = InMemoryEditorialStore::new();
        let article = draft("owner");
        store.insert_article(article.clone()).await.unwrap();
        let pending = store.commit_transition(submit(&article)).await.unwrap().article;
        let approved = store.commit_transition(approve(&pending, "ed")).await.unwrap().article;

        // a later decision at an already decided level keeps the earlier row
        let reject = TransitionCommit {
            article_id: article.id.clone(),
            expected_status: approved.status,
            expected_version: approved.version,
            to: ArticleStatus::Rejected,
            starts_cycle: false,
            decision: Some(DecisionWrite {
                level: ReviewLevel::UnitEditor,
                reviewer: UserId::new("chief"),
                decision: ReviewDecision::Rejected,
                comment: Some("facts changed".to_string()),
            }),
            open_stage: None,
            release_lock: true,
            at: Utc::now(),
        };
        let outcome = store.commit_transition(reject).await.unwrap();
        assert_eq!(outcome.article.status, ArticleStatus::Rejected);
        assert_eq!(outcome.released_lock, None);

        let editor_rows = store
            .list_reviews(&article.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.review_level == ReviewLevel::UnitEditor)
            .collect::<Vec<_>>();
        assert_eq!(editor_rows.len(), 2);
        assert_eq!(editor_rows[0].decision, ReviewDecision::Approved);
        assert_eq!(editor_rows[1].decision, ReviewDecision::Rejected);
        assert_eq!(editor_rows[1].user_id, Some(UserId::new("chief")));
    }

    #[tokio::test]
    async fn lock_acquire_refresh_and_conflict() {
        let store = InMemoryEditorialStore::new();
        let article_id = ArticleId::new("a1");
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let t0 = Utc::now();

        let first = store
            .try_acquire_lock(&article_id, &u1, t0, t0 + Duration::seconds(120))
            .await
            .unwrap();
        assert!(matches!(first, LockAcquisition::Acquired(_)));

        let again = store
            .try_acquire_lock(
                &article_id,
                &u1,
                t0 + Duration::seconds(30),
                t0 + Duration::seconds(150),
            )
            .await
            .unwrap();
        match again {
            LockAcquisition::Refreshed(lock) => {
                assert_eq!(lock.acquired_at, t0);
                assert_eq!(lock.expires_at, t0 + Duration::seconds(150));
            }
            other => panic!("expected refresh, got {:?}", other),
        }

        let other = store
            .try_acquire_lock(
                &article_id,
                &u2,
                t0 + Duration::seconds(60),
                t0 + Duration::seconds(180),
            )
            .await
            .unwrap();
        assert!(matches!(other, LockAcquisition::Held(ref l) if l.holder_id == u1));

        let after_expiry = store
            .try_acquire_lock(
                &article_id,
                &u2,
                t0 + Duration::seconds(150),
                t0 + Duration::seconds(270),
            )
            .await
            .unwrap();
        assert!(matches!(after_expiry, LockAcquisition::Acquired(ref l) if l.holder_id == u2));
    }

    #[tokio::test]
    async fn renew_reports_lapsed_and_foreign_locks() {
        let store = InMemoryEditorialStore::new();
        let article_id = ArticleId::new("a1");
        let (u1, u2) = (UserId::new("u1"), UserId::new("u2"));
        let t0 = Utc::now();

        assert_eq!(
            store
                .renew_lock(&article_id, &u1, t0, t0 + Duration::seconds(120))
                .await
                .unwrap(),
            LockRenewal::Lapsed
        );

        store
            .try_acquire_lock(&article_id, &u1, t0, t0 + Duration::seconds(120))
            .await
            .unwrap();
        assert!(matches!(
            store
                .renew_lock(&article_id, &u2, t0, t0 + Duration::seconds(120))
                .await
                .unwrap(),
            LockRenewal::HeldByOther(_)
        ));
        assert!(matches!(
            store
                .renew_lock(&article_id, &u1, t0 + Duration::seconds(60), t0 + Duration::seconds(180))
                .await
                .unwrap(),
            LockRenewal::Renewed(_)
        ));
        assert_eq!(
            store
                .renew_lock(
                    &article_id,
                    &u1,
                    t0 + Duration::seconds(180),
                    t0 + Duration::seconds(300)
                )
                .await
                .unwrap(),
            LockRenewal::Lapsed
        );
    }

    #[tokio::test]
    async fn release_is_holder_only() {
        let store = InMemoryEditorialStore::new();
        let article_id = ArticleId::new("a1");
        let t0 = Utc::now();
        store
            .try_acquire_lock(&article_id, &UserId::new("u1"), t0, t0 + Duration::seconds(120))
            .await
            .unwrap();

        assert!(!store
            .release_lock(&article_id, &UserId::new("u2"))
            .await
            .unwrap());
        assert!(store.get_lock(&article_id).await.unwrap().is_some());
        assert!(store
            .release_lock(&article_id, &UserId::new("u1"))
            .await
            .unwrap());
        assert!(!store
            .release_lock(&article_id, &UserId::new("u1"))
            .await
            .unwrap());
    }
}
