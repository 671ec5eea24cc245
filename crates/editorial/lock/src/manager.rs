use crate::{Clock, LockConfig, SystemClock};
use editorial_storage::{LockAcquisition, LockRenewal, LockStore};
use editorial_types::{
    ArticleId, EditLock, EditorialError, EditorialResult, LockStatus, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Successful acquire outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockGrant {
    /// A new lease was written
    Acquired(EditLock),
    /// The caller already held the lock; the lease was extended
    Refreshed(EditLock),
}

impl LockGrant {
    pub fn lock(&self) -> &EditLock {
        match self {
            LockGrant::Acquired(lock) | LockGrant::Refreshed(lock) => lock,
        }
    }

    pub fn into_lock(self) -> EditLock {
        match self {
            LockGrant::Acquired(lock) | LockGrant::Refreshed(lock) => lock,
        }
    }
}

/// Lease-based edit lock manager over a [`LockStore`].
///
/// Every operation is one conditional write in the store, so managers in
/// different processes sharing a database stay mutually exclusive.
pub struct EditLockManager<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LockConfig,
}

impl<S: ?Sized> Clone for EditLockManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S> EditLockManager<S>
where
    S: LockStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: LockConfig) -> EditorialResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        config: LockConfig,
        clock: Arc<dyn Clock>,
    ) -> EditorialResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Take or refresh the lease. Fails with `LockConflict` while another
    /// holder is live.
    pub async fn acquire(
        &self,
        article_id: &ArticleId,
        caller: &UserId,
    ) -> EditorialResult<LockGrant> {
        let now = self.clock.now();
        let expires_at = now + self.config.lease();
        let outcome = self
            .store
            .try_acquire_lock(article_id, caller, now, expires_at)
            .await
            .map_err(|e| e.for_article(article_id))?;

        match outcome {
            LockAcquisition::Acquired(lock) => {
                info!(
                    article_id = %article_id,
                    holder = %caller,
                    expires_at = %lock.expires_at,
                    "edit lock acquired"
                );
                Ok(LockGrant::Acquired(lock))
            }
            LockAcquisition::Refreshed(lock) => {
                debug!(article_id = %article_id, holder = %caller, "edit lock refreshed");
                Ok(LockGrant::Refreshed(lock))
            }
            LockAcquisition::Held(lock) => {
                debug!(
                    article_id = %article_id,
                    caller = %caller,
                    holder = %lock.holder_id,
                    "edit lock held by another user"
                );
                Err(EditorialError::LockConflict {
                    article_id: article_id.clone(),
                    holder: lock.holder_id,
                    expires_at: lock.expires_at,
                })
            }
        }
    }

    /// Extend the caller's live lease.
    pub async fn renew(&self, article_id: &ArticleId, caller: &UserId) -> EditorialResult<EditLock> {
        let now = self.clock.now();
        let expires_at = now + self.config.lease();
        let outcome = self
            .store
            .renew_lock(article_id, caller, now, expires_at)
            .await
            .map_err(|e| e.for_article(article_id))?;

        match outcome {
            LockRenewal::Renewed(lock) => {
                debug!(article_id = %article_id, holder = %caller, "edit lock renewed");
                Ok(lock)
            }
            LockRenewal::HeldByOther(lock) => Err(EditorialError::LockConflict {
                article_id: article_id.clone(),
                holder: lock.holder_id,
                expires_at: lock.expires_at,
            }),
            LockRenewal::Lapsed => {
                info!(article_id = %article_id, holder = %caller, "edit lease lapsed before renewal");
                Err(EditorialError::LockExpired(article_id.clone()))
            }
        }
    }

    /// Drop the caller's lock. Returns `false` when the caller held nothing.
    pub async fn release(&self, article_id: &ArticleId, caller: &UserId) -> EditorialResult<bool> {
        let released = self
            .store
            .release_lock(article_id, caller)
            .await
            .map_err(|e| e.for_article(article_id))?;
        if released {
            info!(article_id = %article_id, holder = %caller, "edit lock released");
        }
        Ok(released)
    }

    /// The caller's view of the lock, liveness checked now.
    pub async fn status(&self, article_id: &ArticleId, caller: &UserId) -> EditorialResult<LockStatus> {
        Ok(match self.live_lock(article_id).await? {
            Some(lock) => LockStatus::from_lock(&lock, caller),
            None => LockStatus::unlocked(article_id.clone()),
        })
    }

    /// The lock row if it is still live.
    pub async fn live_lock(&self, article_id: &ArticleId) -> EditorialResult<Option<EditLock>> {
        let now = self.clock.now();
        let lock = self
            .store
            .get_lock(article_id)
            .await
            .map_err(|e| e.for_article(article_id))?;
        Ok(lock.filter(|l| l.is_live(now)))
    }

    /// Whether `caller` holds a live lock on the article.
    pub async fn is_held_by(&self, article_id: &ArticleId, caller: &UserId) -> EditorialResult<bool> {
        Ok(self
            .live_lock(article_id)
            .await?
            .is_some_and(|l| &l.holder_id == caller))
    }
}
