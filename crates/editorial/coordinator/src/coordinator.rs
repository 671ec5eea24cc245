use crate::{ContentUpdate, EditGrant, NewArticle, WorkflowEvent};
use editorial_ledger::{PendingReview, ReviewerLedger};
use editorial_lock::{Clock, EditLockManager, LeaseRenewer, LockConfig, LockGrant, SystemClock};
use editorial_storage::memory::InMemoryEditorialStore;
use editorial_storage::{DecisionWrite, EditGuard, EditorialStore, QueryWindow, TransitionCommit};
use editorial_types::{
    Article, ArticleId, ArticleStatus, Caller, EditLock, EditorialError, EditorialResult,
    LockStatus, ReviewDecision, ReviewLevel, ReviewerEntry, Role, UserId, WorkflowAction,
};
use editorial_workflow::{stage_for_level, WorkflowStateMachine};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

const EVENT_CAPACITY: usize = 256;

/// Lowest rank that may create articles
const AUTHOR_ROLE: Role = Role::Contributor;

/// Lowest rank that may edit an article under review without being an author
const REVIEW_EDIT_ROLE: Role = Role::Editor;

/// Integration facade over the state machine, ledger and lock manager.
pub struct WorkflowCoordinator {
    store: Arc<dyn EditorialStore>,
    locks: Arc<EditLockManager<dyn EditorialStore>>,
    ledger: ReviewerLedger,
    machine: WorkflowStateMachine,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowCoordinator {
    pub fn new(store: Arc<dyn EditorialStore>, config: LockConfig) -> EditorialResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Build with an explicit clock shared by the coordinator and its locks.
    pub fn with_clock(
        store: Arc<dyn EditorialStore>,
        config: LockConfig,
        clock: Arc<dyn Clock>,
    ) -> EditorialResult<Self> {
        let locks = EditLockManager::with_clock(Arc::clone(&store), config, Arc::clone(&clock))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            ledger: ReviewerLedger::with_storage(Arc::clone(&store)),
            locks: Arc::new(locks),
            machine: WorkflowStateMachine::new(),
            store,
            clock,
            events,
        })
    }

    /// In-memory coordinator with default lock timing
    pub fn in_memory() -> EditorialResult<Self> {
        Self::new(Arc::new(InMemoryEditorialStore::new()), LockConfig::default())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn lock_config(&self) -> &LockConfig {
        self.locks.config()
    }

    /// Renewer for driving a `LeaseHeartbeat` in-process
    pub fn lease_renewer(&self) -> Arc<dyn LeaseRenewer> {
        self.locks.clone()
    }

    pub fn ledger(&self) -> &ReviewerLedger {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Articles
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(caller = %caller.user_id))]
    pub async fn create_article(
        &self,
        caller: &Caller,
        request: NewArticle,
    ) -> EditorialResult<Article> {
        if !caller.roles.satisfies(AUTHOR_ROLE) {
            return Err(EditorialError::Authorization(format!(
                "creating articles requires rank {}, caller {} has {}",
                AUTHOR_ROLE,
                caller.user_id,
                caller.rank()
            )));
        }
        let title = validate_title(&request.title)?;

        let now = self.clock.now();
        let mut article = Article::draft(caller.user_id.clone(), title, request.body, now);
        for contributor in request.contributors {
            article = article.with_contributor(contributor);
        }

        let article_id = article.id.clone();
        self.store
            .insert_article(article.clone())
            .await
            .map_err(|e| e.for_article(&article_id))?;

        info!(article_id = %article.id, owner = %article.owner_id, "article created");
        self.emit(WorkflowEvent::Created {
            article_id: article.id.clone(),
            owner_id: article.owner_id.clone(),
            at: now,
        });
        Ok(article)
    }

    /// Fetch a live article. Soft-deleted articles are not found.
    pub async fn get_article(&self, article_id: &ArticleId) -> EditorialResult<Article> {
        self.load(article_id).await
    }

    pub async fn list_articles(
        &self,
        status: Option<ArticleStatus>,
        window: QueryWindow,
    ) -> EditorialResult<Vec<Article>> {
        self.store
            .list_articles(status, window)
            .await
            .map_err(EditorialError::from)
    }

    /// Change title and/or body.
    ///
    /// Drafts may be edited by their authors. Under review the caller must
    /// hold the live edit lock, and the write itself is conditional on that
    /// lease. Published and rejected articles are refused.
    #[instrument(skip_all, fields(article_id = %article_id, caller = %caller.user_id))]
    pub async fn update_content(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
        update: ContentUpdate,
    ) -> EditorialResult<Article> {
        let article = self.load(article_id).await?;
        self.ensure_editable(&article)?;

        let guarded = article.status != ArticleStatus::Draft;
        if !guarded {
            if !article.authorship(&caller.user_id).is_author() {
                return Err(EditorialError::Authorization(
                    "only the owner or a contributor may edit a draft".to_string(),
                ));
            }
        } else if !self.locks.is_held_by(article_id, &caller.user_id).await? {
            return Err(EditorialError::LockRequired(article_id.clone()));
        }

        if let Some(expected) = update.expected_version {
            if expected != article.version {
                return Err(EditorialError::StaleState(article_id.clone()));
            }
        }
        if update.is_empty() {
            return Ok(article);
        }

        let mut next = article.clone();
        if let Some(title) = update.title {
            next.title = validate_title(&title)?;
        }
        if let Some(body) = update.body {
            next.body = body;
        }
        let now = self.clock.now();
        next.updated_at = now;

        // The store re-checks the lease inside the write itself
        let guard = guarded.then(|| EditGuard::new(caller.user_id.clone(), now));
        let stored = self.write(article.version, next, guard).await?;
        debug!(article_id = %article_id, version = stored.version, "content updated");
        self.emit(WorkflowEvent::ContentUpdated {
            article_id: article_id.clone(),
            editor: caller.user_id.clone(),
            version: stored.version,
        });
        Ok(stored)
    }

    /// Owner adds a co-author. Not allowed once published.
    pub async fn add_contributor(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
        contributor: UserId,
    ) -> EditorialResult<Article> {
        let article = self.load(article_id).await?;
        if article.owner_id != caller.user_id {
            return Err(EditorialError::Authorization(
                "only the owner may add contributors".to_string(),
            ));
        }
        if article.status == ArticleStatus::Published {
            return Err(EditorialError::PublishedReadOnly(article_id.clone()));
        }
        if article.authorship(&contributor).is_author() {
            return Ok(article);
        }

        let mut next = article.clone().with_contributor(contributor.clone());
        next.updated_at = self.clock.now();
        let stored = self.write(article.version, next, None).await?;
        info!(article_id = %article_id, contributor = %contributor, "contributor added");
        Ok(stored)
    }

    /// Soft delete, allowed in `DRAFT` and `REJECTED` for the owner or a
    /// system admin.
    #[instrument(skip_all, fields(article_id = %article_id, caller = %caller.user_id))]
    pub async fn delete_article(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<()> {
        let article = self.load(article_id).await?;
        if article.owner_id != caller.user_id && !caller.roles.satisfies(Role::SystemAdmin) {
            return Err(EditorialError::Authorization(
                "only the owner or a system admin may delete an article".to_string(),
            ));
        }
        if article.status == ArticleStatus::Published {
            return Err(EditorialError::PublishedReadOnly(article_id.clone()));
        }
        if !article.status.is_deletable() {
            return Err(EditorialError::Validation(format!(
                "article in status {} cannot be deleted",
                article.status
            )));
        }

        let now = self.clock.now();
        let mut next = article.clone();
        next.deleted_at = Some(now);
        next.updated_at = now;
        self.write(article.version, next, None).await?;

        info!(article_id = %article_id, "article deleted");
        self.emit(WorkflowEvent::Deleted {
            article_id: article_id.clone(),
            actor: caller.user_id.clone(),
            at: now,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edit sessions
    // ------------------------------------------------------------------

    /// Start (or continue) an edit session.
    #[instrument(skip_all, fields(article_id = %article_id, caller = %caller.user_id))]
    pub async fn request_edit(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
    ) -> EditorialResult<EditGrant> {
        let article = self.load(article_id).await?;
        self.ensure_editable(&article)?;

        let is_author = article.authorship(&caller.user_id).is_author();
        if article.status == ArticleStatus::Draft {
            return if is_author {
                Ok(EditGrant::NotRequired)
            } else {
                Err(EditorialError::Authorization(
                    "only the owner or a contributor may edit a draft".to_string(),
                ))
            };
        }
        if !is_author && !caller.roles.satisfies(REVIEW_EDIT_ROLE) {
            return Err(EditorialError::Authorization(format!(
                "editing an article under review requires authorship or rank {}",
                REVIEW_EDIT_ROLE
            )));
        }

        let grant = match self.locks.acquire(article_id, &caller.user_id).await {
            Ok(grant) => grant,
            Err(EditorialError::LockConflict {
                holder, expires_at, ..
            }) => return Ok(EditGrant::Denied { holder, expires_at }),
            Err(err) => return Err(err),
        };

        // A transition may have landed between the load and the acquire.
        let current = self.load(article_id).await?;
        if !self.machine.requires_lock(current.status) {
            self.locks.release(article_id, &caller.user_id).await?;
            return Err(EditorialError::StaleState(article_id.clone()));
        }

        Ok(match grant {
            LockGrant::Acquired(lock) => {
                self.emit(WorkflowEvent::LockAcquired {
                    article_id: article_id.clone(),
                    holder: lock.holder_id.clone(),
                    expires_at: lock.expires_at,
                });
                EditGrant::Acquired { lock }
            }
            LockGrant::Refreshed(lock) => EditGrant::AlreadyHeld { lock },
        })
    }

    /// Heartbeat renewal of the caller's lease.
    pub async fn renew_edit(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<EditLock> {
        self.load(article_id).await?;
        self.locks.renew(article_id, &caller.user_id).await
    }

    /// Explicit end of an edit session. Never fails for a non-holder.
    pub async fn end_edit_session(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<bool> {
        let released = self.locks.release(article_id, &caller.user_id).await?;
        if released {
            self.emit(WorkflowEvent::LockReleased {
                article_id: article_id.clone(),
                holder: caller.user_id.clone(),
            });
        }
        Ok(released)
    }

    pub async fn lock_status(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<LockStatus> {
        self.load(article_id).await?;
        self.locks.status(article_id, &caller.user_id).await
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Record a reviewer decision at the article's current stage.
    pub async fn submit_decision(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> EditorialResult<Article> {
        let action = WorkflowAction::from_decision(decision)?;
        self.transition(article_id, caller, action, comment).await
    }

    pub async fn submit(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<Article> {
        self.transition(article_id, caller, WorkflowAction::Submit, None)
            .await
    }

    pub async fn reopen(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<Article> {
        self.transition(article_id, caller, WorkflowAction::Reopen, None)
            .await
    }

    pub async fn approve(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
        comment: Option<String>,
    ) -> EditorialResult<Article> {
        self.transition(article_id, caller, WorkflowAction::Approve, comment)
            .await
    }

    pub async fn reject(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
        comment: Option<String>,
    ) -> EditorialResult<Article> {
        self.transition(article_id, caller, WorkflowAction::Reject, comment)
            .await
    }

    pub async fn publish(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<Article> {
        self.transition(article_id, caller, WorkflowAction::Publish, None)
            .await
    }

    pub async fn unpublish(&self, article_id: &ArticleId, caller: &Caller) -> EditorialResult<Article> {
        self.transition(article_id, caller, WorkflowAction::Unpublish, None)
            .await
    }

    /// Plan `action` against the current status and commit it as one
    /// compare-and-swap. Losing the race yields `StaleState`.
    #[instrument(skip_all, fields(article_id = %article_id, caller = %caller.user_id, action = %action))]
    pub async fn transition(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
        action: WorkflowAction,
        comment: Option<String>,
    ) -> EditorialResult<Article> {
        let article = self.load(article_id).await?;
        let plan = self.machine.plan(
            article.status,
            action,
            caller,
            article.authorship(&caller.user_id),
        )?;

        let now = self.clock.now();
        let commit = TransitionCommit {
            article_id: article_id.clone(),
            expected_status: article.status,
            expected_version: article.version,
            to: plan.to,
            starts_cycle: plan.starts_cycle,
            decision: plan.record.map(|record| DecisionWrite {
                level: record.level,
                reviewer: caller.user_id.clone(),
                decision: record.decision,
                comment: comment.clone(),
            }),
            open_stage: plan.open_stage,
            release_lock: plan.release_lock,
            at: now,
        };

        let outcome = self
            .store
            .commit_transition(commit)
            .await
            .map_err(|e| e.for_article(article_id))?;
        let updated = outcome.article;

        info!(
            article_id = %article_id,
            from = %plan.from,
            to = %plan.to,
            cycle = updated.review_cycle,
            "article transitioned"
        );
        self.emit(WorkflowEvent::Transitioned {
            article_id: article_id.clone(),
            action,
            from: plan.from,
            to: plan.to,
            actor: caller.user_id.clone(),
            at: now,
        });
        if let Some(lock) = outcome.released_lock.filter(|lock| lock.is_live(now)) {
            self.emit(WorkflowEvent::LockReleased {
                article_id: article_id.clone(),
                holder: lock.holder_id,
            });
        }
        Ok(updated)
    }

    /// Actions the caller could take right now
    pub async fn available_actions(
        &self,
        article_id: &ArticleId,
        caller: &Caller,
    ) -> EditorialResult<Vec<WorkflowAction>> {
        let article = self.load(article_id).await?;
        Ok(self.machine.available_actions(
            article.status,
            caller,
            article.authorship(&caller.user_id),
        ))
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Full review history of an article across cycles
    pub async fn reviews(&self, article_id: &ArticleId) -> EditorialResult<Vec<ReviewerEntry>> {
        self.ledger.history(article_id).await
    }

    /// Review rows of the current cycle only
    pub async fn current_reviews(&self, article_id: &ArticleId) -> EditorialResult<Vec<ReviewerEntry>> {
        self.ledger.current_cycle(article_id).await
    }

    /// Reviewer inbox for `level`. The caller must be able to decide there.
    pub async fn pending_reviews(
        &self,
        caller: &Caller,
        level: ReviewLevel,
        window: QueryWindow,
    ) -> EditorialResult<Vec<PendingReview>> {
        let required = stage_for_level(level).required_role;
        if !caller.roles.satisfies(required) {
            return Err(EditorialError::Authorization(format!(
                "the {} inbox requires rank {}",
                level, required
            )));
        }
        self.ledger.pending_for(level, window).await
    }

    // ------------------------------------------------------------------

    async fn load(&self, article_id: &ArticleId) -> EditorialResult<Article> {
        match self
            .store
            .get_article(article_id)
            .await
            .map_err(|e| e.for_article(article_id))?
        {
            Some(article) if !article.is_deleted() => Ok(article),
            _ => Err(EditorialError::NotFound(article_id.clone())),
        }
    }

    async fn write(
        &self,
        expected_version: u64,
        article: Article,
        guard: Option<EditGuard>,
    ) -> EditorialResult<Article> {
        let article_id = article.id.clone();
        self.store
            .update_article(expected_version, article, guard)
            .await
            .map_err(|e| e.for_article(&article_id))
    }

    /// Published and rejected articles take no content edits.
    fn ensure_editable(&self, article: &Article) -> EditorialResult<()> {
        match article.status {
            status if self.machine.is_editable(status) => Ok(()),
            ArticleStatus::Published => Err(EditorialError::PublishedReadOnly(article.id.clone())),
            _ => Err(EditorialError::RejectedReadOnly(article.id.clone())),
        }
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn validate_title(title: &str) -> EditorialResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(EditorialError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
