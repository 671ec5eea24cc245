//! Client-side lease heartbeat.
//!
//! An editing session keeps its lock alive by renewing on a fixed interval
//! shorter than the lease. The session ends in one of three ways:
//! - [`LeaseHeartbeat::stop`]: renewals stop and the lock is released
//! - the handle is dropped: renewals stop and a release is fired without
//!   waiting for it; if that fails the lease simply lapses
//! - a renewal fails: the state flips to [`HeartbeatState::Lost`] and the
//!   task exits

use crate::{EditLockManager, LockConfig};
use async_trait::async_trait;
use editorial_storage::LockStore;
use editorial_types::{ArticleId, EditorialResult, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Whatever can extend and drop a lease on behalf of a holder.
#[async_trait]
pub trait LeaseRenewer: Send + Sync {
    async fn renew_lease(&self, article_id: &ArticleId, holder: &UserId) -> EditorialResult<()>;

    async fn release_lease(&self, article_id: &ArticleId, holder: &UserId)
        -> EditorialResult<bool>;
}

#[async_trait]
impl<S> LeaseRenewer for EditLockManager<S>
where
    S: LockStore + ?Sized + 'static,
{
    async fn renew_lease(&self, article_id: &ArticleId, holder: &UserId) -> EditorialResult<()> {
        self.renew(article_id, holder).await.map(|_| ())
    }

    async fn release_lease(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
    ) -> EditorialResult<bool> {
        self.release(article_id, holder).await
    }
}

/// Observable heartbeat state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatState {
    Active { renewals: u64 },
    /// A renewal failed; the lease is gone or belongs to someone else
    Lost(String),
    Stopped,
}

/// Handle to a running heartbeat task.
pub struct LeaseHeartbeat {
    article_id: ArticleId,
    holder: UserId,
    renewer: Arc<dyn LeaseRenewer>,
    state: watch::Receiver<HeartbeatState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LeaseHeartbeat {
    /// Spawn the renewal task. Must be called inside a tokio runtime.
    pub fn start(
        renewer: Arc<dyn LeaseRenewer>,
        article_id: ArticleId,
        holder: UserId,
        config: &LockConfig,
    ) -> EditorialResult<Self> {
        config.validate()?;

        let (state_tx, state_rx) = watch::channel(HeartbeatState::Active { renewals: 0 });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_heartbeat(
            Arc::clone(&renewer),
            article_id.clone(),
            holder.clone(),
            config.heartbeat_interval(),
            state_tx,
            shutdown_rx,
        ));
        debug!(
            article_id = %article_id,
            holder = %holder,
            interval_secs = config.heartbeat_interval_secs,
            "lease heartbeat started"
        );

        Ok(Self {
            article_id,
            holder,
            renewer,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn article_id(&self) -> &ArticleId {
        &self.article_id
    }

    pub fn state(&self) -> HeartbeatState {
        self.state.borrow().clone()
    }

    /// Watch state changes, e.g. to react to [`HeartbeatState::Lost`].
    pub fn subscribe(&self) -> watch::Receiver<HeartbeatState> {
        self.state.clone()
    }

    /// End the session: stop renewing, then release the lock.
    ///
    /// Release is best effort. A failure is logged and reported as `false`;
    /// the lease then lapses on its own.
    pub async fn stop(mut self) -> bool {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(article_id = %self.article_id, error = %err, "heartbeat task ended abnormally");
            }
        }

        match self.renewer.release_lease(&self.article_id, &self.holder).await {
            Ok(released) => released,
            Err(err) => {
                warn!(
                    article_id = %self.article_id,
                    holder = %self.holder,
                    error = %err,
                    "failed to release edit lock; lease will lapse"
                );
                false
            }
        }
    }
}

impl Drop for LeaseHeartbeat {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(article_id = %self.article_id, "heartbeat dropped outside a runtime; lease will lapse");
            return;
        };
        let renewer = Arc::clone(&self.renewer);
        let article_id = self.article_id.clone();
        let holder = self.holder.clone();
        runtime.spawn(async move {
            if let Err(err) = renewer.release_lease(&article_id, &holder).await {
                warn!(
                    article_id = %article_id,
                    holder = %holder,
                    error = %err,
                    "release on drop failed; lease will lapse"
                );
            }
        });
    }
}

async fn run_heartbeat(
    renewer: Arc<dyn LeaseRenewer>,
    article_id: ArticleId,
    holder: UserId,
    period: Duration,
    state: watch::Sender<HeartbeatState>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut renewals = 0u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = state.send(HeartbeatState::Stopped);
                return;
            }
            _ = ticker.tick() => {
                match renewer.renew_lease(&article_id, &holder).await {
                    Ok(()) => {
                        renewals += 1;
                        let _ = state.send(HeartbeatState::Active { renewals });
                    }
                    Err(err) => {
                        warn!(
                            article_id = %article_id,
                            holder = %holder,
                            error = %err,
                            "edit lease lost"
                        );
                        let _ = state.send(HeartbeatState::Lost(err.to_string()));
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::ManualClock;
    use chrono::Utc;
    use editorial_storage::memory::InMemoryEditorialStore;

    struct Fixture {
        manager: Arc<EditLockManager<InMemoryEditorialStore>>,
        clock: Arc<ManualClock>,
        article: ArticleId,
        editor: UserId,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = EditLockManager::with_clock(
            Arc::new(InMemoryEditorialStore::new()),
            LockConfig::default(),
            clock.clone(),
        )
        .unwrap();
        let fx = Fixture {
            manager: Arc::new(manager),
            clock,
            article: ArticleId::new("a1"),
            editor: UserId::new("editor"),
        };
        fx.manager.acquire(&fx.article, &fx.editor).await.unwrap();
        fx
    }

    fn start(fx: &Fixture) -> LeaseHeartbeat {
        LeaseHeartbeat::start(
            fx.manager.clone(),
            fx.article.clone(),
            fx.editor.clone(),
            &LockConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_extends_the_lease() {
        let fx = fixture().await;
        let heartbeat = start(&fx);
        let mut state = heartbeat.subscribe();

        fx.clock.advance(chrono::Duration::seconds(60));
        state.changed().await.unwrap();
        assert_eq!(heartbeat.state(), HeartbeatState::Active { renewals: 1 });

        let lock = fx.manager.live_lock(&fx.article).await.unwrap().unwrap();
        assert_eq!(lock.expires_at, fx.clock.now() + chrono::Duration::seconds(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_reports_lost_lease() {
        let fx = fixture().await;
        let heartbeat = start(&fx);
        let mut state = heartbeat.subscribe();

        fx.clock.advance(chrono::Duration::seconds(121));
        fx.manager
            .acquire(&fx.article, &UserId::new("someone-else"))
            .await
            .unwrap();

        state.changed().await.unwrap();
        assert!(matches!(heartbeat.state(), HeartbeatState::Lost(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_releases_the_lock() {
        let fx = fixture().await;
        let heartbeat = start(&fx);

        assert!(heartbeat.stop().await);
        assert!(fx.manager.live_lock(&fx.article).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_in_background() {
        let fx = fixture().await;
        let heartbeat = start(&fx);
        drop(heartbeat);

        for _ in 0..10 {
            if fx.manager.live_lock(&fx.article).await.unwrap().is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(fx.manager.live_lock(&fx.article).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_slow_interval() {
        let fx = fixture().await;
        let config = LockConfig {
            lease_duration_secs: 30,
            heartbeat_interval_secs: 30,
        };
        let result = LeaseHeartbeat::start(fx.manager.clone(), fx.article.clone(), fx.editor.clone(), &config);
        assert!(result.is_err());
    }
}
