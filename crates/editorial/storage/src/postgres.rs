//! PostgreSQL adapter for editorial storage.
//!
//! Articles are stored as a JSONB document next to the columns that
//! conditional writes compare on (`status`, `version`, `review_cycle`).
//! Transitions run in one transaction holding the article row lock;
//! lock leases use a single conditional upsert so concurrent acquirers on
//! different daemons serialize on the primary key.

use crate::model::{
    EditGuard, LockAcquisition, LockRenewal, QueryWindow, TransitionCommit, TransitionOutcome,
};
use crate::traits::{ArticleStore, LockStore, ReviewStore, WorkflowStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use editorial_types::{
    Article, ArticleId, ArticleStatus, EditLock, EntryId, ReviewDecision, ReviewLevel,
    ReviewerEntry, UserId,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

const ACQUIRE_ATTEMPTS: usize = 3;

/// PostgreSQL-backed editorial store.
#[derive(Clone)]
pub struct PostgresEditorialStore {
    pool: PgPool,
}

impl PostgresEditorialStore {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        tracing::debug!(max_connections, "editorial postgres pool ready");
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS editorial_articles (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                version BIGINT NOT NULL,
                review_cycle INTEGER NOT NULL,
                data JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS editorial_reviews (
                entry_id UUID PRIMARY KEY,
                article_id TEXT NOT NULL REFERENCES editorial_articles(id),
                cycle INTEGER NOT NULL,
                review_level TEXT NOT NULL,
                user_id TEXT,
                decision TEXT NOT NULL,
                comment TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                decided_at TIMESTAMPTZ
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS editorial_locks (
                article_id TEXT PRIMARY KEY,
                holder_id TEXT NOT NULL,
                acquired_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS editorial_reviews_pending_idx ON editorial_reviews (review_level, decision)",
            "CREATE UNIQUE INDEX IF NOT EXISTS editorial_reviews_open_idx ON editorial_reviews (article_id, cycle, review_level) WHERE decision = 'PENDING'",
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    async fn write_decision(
        tx: &mut Transaction<'_, Postgres>,
        commit: &TransitionCommit,
        cycle: u32,
    ) -> StorageResult<()> {
        let Some(write) = &commit.decision else {
            return Ok(());
        };
        if !write.decision.is_final() {
            return Err(StorageError::InvariantViolation(
                "a pending decision cannot be recorded".to_string(),
            ));
        }

        let updated = sqlx::query(
            r#"
            UPDATE editorial_reviews
               SET user_id = $1,
                   decision = $2,
                   comment = $3,
                   decided_at = $4
             WHERE article_id = $5
               AND cycle = $6
               AND review_level = $7
               AND decision = 'PENDING'
            "#,
        )
        .bind(write.reviewer.as_str())
        .bind(write.decision.as_str())
        .bind(write.comment.clone())
        .bind(commit.at)
        .bind(commit.article_id.as_str())
        .bind(cycle as i32)
        .bind(write.level.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if updated.rows_affected() > 0 {
            return Ok(());
        }

        // No open placeholder at this level: the decision becomes its own row.
        sqlx::query(
            r#"
            INSERT INTO editorial_reviews
                (entry_id, article_id, cycle, review_level, user_id, decision, comment, created_at, decided_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(commit.article_id.as_str())
        .bind(cycle as i32)
        .bind(write.level.as_str())
        .bind(write.reviewer.as_str())
        .bind(write.decision.as_str())
        .bind(write.comment.clone())
        .bind(commit.at)
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PostgresEditorialStore {
    async fn insert_article(&self, article: Article) -> StorageResult<()> {
        let data = article_to_json(&article)?;
        sqlx::query(
            r#"
            INSERT INTO editorial_articles
                (id, status, version, review_cycle, data, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(article.id.as_str())
        .bind(article.status.as_str())
        .bind(to_i64(article.version)?)
        .bind(article.review_cycle as i32)
        .bind(data)
        .bind(article.updated_at)
        .bind(article.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    async fn get_article(&self, article_id: &ArticleId) -> StorageResult<Option<Article>> {
        let row = sqlx::query("SELECT data FROM editorial_articles WHERE id = $1")
            .bind(article_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        row.map(article_from_row).transpose()
    }

    async fn list_articles(
        &self,
        status: Option<ArticleStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT data
              FROM editorial_articles
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR status = $1)
             ORDER BY updated_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit_of(window)?)
        .bind(to_i64(window.offset as u64)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(article_from_row).collect()
    }

    async fn update_article(
        &self,
        expected_version: u64,
        article: Article,
        guard: Option<EditGuard>,
    ) -> StorageResult<Article> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let stored = lock_article_row(&mut tx, &article.id).await?;
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
        if let Some(guard) = &guard {
            let row = sqlx::query(
                r#"
                SELECT article_id, holder_id, acquired_at, expires_at
                  FROM editorial_locks
                 WHERE article_id = $1
                   FOR UPDATE
                "#,
            )
            .bind(article.id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            let lock = row.map(lock_from_row).transpose()?;
            guard.check(&article.id, lock.as_ref())?;
        }

        let mut next = article;
        next.version = stored.version + 1;
        next.created_at = stored.created_at;
        next.published_at = stored.published_at;
        store_article_row(&mut tx, &next).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(next)
    }
}

#[async_trait]
impl WorkflowStore for PostgresEditorialStore {
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> StorageResult<TransitionOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let current = lock_article_row(&mut tx, &commit.article_id).await?;
        if current.status != commit.expected_status || current.version != commit.expected_version
        {
            return Err(StorageError::Conflict(format!(
                "article {} moved to {} (version {}) before {} could apply",
                commit.article_id, current.status, current.version, commit.to
            )));
        }

        let next = commit.apply_to(&current);
        store_article_row(&mut tx, &next).await?;
        Self::write_decision(&mut tx, &commit, next.review_cycle).await?;

        if let Some(level) = commit.open_stage {
            let entry =
                ReviewerEntry::placeholder(commit.article_id.clone(), next.review_cycle, level, commit.at);
            sqlx::query(
                r#"
                INSERT INTO editorial_reviews
                    (entry_id, article_id, cycle, review_level, user_id, decision, comment, created_at, decided_at)
                VALUES ($1, $2, $3, $4, NULL, $5, NULL, $6, NULL)
                "#,
            )
            .bind(entry.entry_id.as_uuid())
            .bind(entry.article_id.as_str())
            .bind(entry.cycle as i32)
            .bind(entry.review_level.as_str())
            .bind(entry.decision.as_str())
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_conflict)?;
        }

        let released_lock = if commit.release_lock {
            let row = sqlx::query(
                r#"
                DELETE FROM editorial_locks
                 WHERE article_id = $1
                RETURNING article_id, holder_id, acquired_at, expires_at
                "#,
            )
            .bind(commit.article_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
            row.map(lock_from_row).transpose()?
        } else {
            None
        };

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(TransitionOutcome {
            article: next,
            released_lock,
        })
    }
}

#[async_trait]
impl ReviewStore for PostgresEditorialStore {
    async fn list_reviews(&self, article_id: &ArticleId) -> StorageResult<Vec<ReviewerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT entry_id, article_id, cycle, review_level, user_id, decision, comment, created_at, decided_at
              FROM editorial_reviews
             WHERE article_id = $1
             ORDER BY cycle ASC, created_at ASC
            "#,
        )
        .bind(article_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut entries = rows
            .into_iter()
            .map(review_from_row)
            .collect::<StorageResult<Vec<_>>>()?;
        entries.sort_by(|a, b| {
            a.cycle
                .cmp(&b.cycle)
                .then(a.review_level.cmp(&b.review_level))
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(entries)
    }

    async fn list_pending_reviews(
        &self,
        level: ReviewLevel,
        window: QueryWindow,
    ) -> StorageResult<Vec<ReviewerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT r.entry_id, r.article_id, r.cycle, r.review_level, r.user_id, r.decision,
                   r.comment, r.created_at, r.decided_at
              FROM editorial_reviews r
              JOIN editorial_articles a ON a.id = r.article_id
             WHERE r.review_level = $1
               AND r.decision = 'PENDING'
               AND r.cycle = a.review_cycle
               AND a.deleted_at IS NULL
             ORDER BY r.created_at ASC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(level.as_str())
        .bind(limit_of(window)?)
        .bind(to_i64(window.offset as u64)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(review_from_row).collect()
    }
}

#[async_trait]
impl LockStore for PostgresEditorialStore {
    async fn try_acquire_lock(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<LockAcquisition> {
        // TIMESTAMPTZ keeps microseconds; truncate so a fresh row compares equal.
        let now = now.trunc_subsecs(6);

        for _ in 0..ACQUIRE_ATTEMPTS {
            let row = sqlx::query(
                r#"
                INSERT INTO editorial_locks (article_id, holder_id, acquired_at, expires_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (article_id) DO UPDATE
                   SET acquired_at = CASE
                            WHEN editorial_locks.holder_id = EXCLUDED.holder_id
                             AND editorial_locks.expires_at > EXCLUDED.acquired_at
                            THEN editorial_locks.acquired_at
                            ELSE EXCLUDED.acquired_at
                       END,
                       holder_id = EXCLUDED.holder_id,
                       expires_at = EXCLUDED.expires_at
                 WHERE editorial_locks.holder_id = EXCLUDED.holder_id
                    OR editorial_locks.expires_at <= EXCLUDED.acquired_at
                RETURNING article_id, holder_id, acquired_at, expires_at
                "#,
            )
            .bind(article_id.as_str())
            .bind(holder.as_str())
            .bind(now)
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

            if let Some(row) = row {
                let lock = lock_from_row(row)?;
                return Ok(if lock.acquired_at < now {
                    LockAcquisition::Refreshed(lock)
                } else {
                    LockAcquisition::Acquired(lock)
                });
            }

            // The upsert's guard failed: a live foreign lock existed. It may
            // have been released or expired since, in which case try again.
            match self.get_lock(article_id).await? {
                Some(lock) if lock.is_live(now) && &lock.holder_id != holder => {
                    return Ok(LockAcquisition::Held(lock));
                }
                _ => {
                    tracing::debug!(article_id = %article_id, "lock row changed under acquire, retrying");
                    continue;
                }
            }
        }

        Err(StorageError::Conflict(format!(
            "lock on article {} kept changing during acquire",
            article_id
        )))
    }

    async fn renew_lock(
        &self,
        article_id: &ArticleId,
        holder: &UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<LockRenewal> {
        let row = sqlx::query(
            r#"
            UPDATE editorial_locks
               SET expires_at = $4
             WHERE article_id = $1
               AND holder_id = $2
               AND expires_at > $3
            RETURNING article_id, holder_id, acquired_at, expires_at
            "#,
        )
        .bind(article_id.as_str())
        .bind(holder.as_str())
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if let Some(row) = row {
            return Ok(LockRenewal::Renewed(lock_from_row(row)?));
        }
        match self.get_lock(article_id).await? {
            Some(lock) if lock.is_live(now) && &lock.holder_id != holder => {
                Ok(LockRenewal::HeldByOther(lock))
            }
            _ => Ok(LockRenewal::Lapsed),
        }
    }

    async fn release_lock(&self, article_id: &ArticleId, holder: &UserId) -> StorageResult<bool> {
        let result =
            sqlx::query("DELETE FROM editorial_locks WHERE article_id = $1 AND holder_id = $2")
                .bind(article_id.as_str())
                .bind(holder.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_lock(&self, article_id: &ArticleId) -> StorageResult<Option<EditLock>> {
        let row = sqlx::query(
            "SELECT article_id, holder_id, acquired_at, expires_at FROM editorial_locks WHERE article_id = $1",
        )
        .bind(article_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        row.map(lock_from_row).transpose()
    }
}

async fn lock_article_row(
    tx: &mut Transaction<'_, Postgres>,
    article_id: &ArticleId,
) -> StorageResult<Article> {
    let row = sqlx::query("SELECT data FROM editorial_articles WHERE id = $1 FOR UPDATE")
        .bind(article_id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    match row {
        Some(row) => article_from_row(row),
        None => Err(StorageError::NotFound(format!(
            "article {} not found",
            article_id
        ))),
    }
}

async fn store_article_row(
    tx: &mut Transaction<'_, Postgres>,
    article: &Article,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        UPDATE editorial_articles
           SET status = $1,
               version = $2,
               review_cycle = $3,
               data = $4,
               updated_at = $5,
               deleted_at = $6
         WHERE id = $7
        "#,
    )
    .bind(article.status.as_str())
    .bind(to_i64(article.version)?)
    .bind(article.review_cycle as i32)
    .bind(article_to_json(article)?)
    .bind(article.updated_at)
    .bind(article.deleted_at)
    .bind(article.id.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(())
}

fn article_to_json(article: &Article) -> StorageResult<serde_json::Value> {
    serde_json::to_value(article).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn article_from_row(row: PgRow) -> StorageResult<Article> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    serde_json::from_value(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn review_from_row(row: PgRow) -> StorageResult<ReviewerEntry> {
    let backend = |e: sqlx::Error| StorageError::Backend(e.to_string());
    let level: String = row.try_get("review_level").map_err(backend)?;
    let decision: String = row.try_get("decision").map_err(backend)?;
    let cycle: i32 = row.try_get("cycle").map_err(backend)?;

    Ok(ReviewerEntry {
        entry_id: EntryId::from_uuid(row.try_get::<Uuid, _>("entry_id").map_err(backend)?),
        article_id: ArticleId::new(row.try_get::<String, _>("article_id").map_err(backend)?),
        cycle: u32::try_from(cycle)
            .map_err(|_| StorageError::Serialization(format!("negative review cycle {cycle}")))?,
        review_level: level
            .parse::<ReviewLevel>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
        user_id: row
            .try_get::<Option<String>, _>("user_id")
            .map_err(backend)?
            .map(UserId::new),
        decision: decision
            .parse::<ReviewDecision>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
        comment: row.try_get("comment").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        decided_at: row.try_get("decided_at").map_err(backend)?,
    })
}

fn lock_from_row(row: PgRow) -> StorageResult<EditLock> {
    let backend = |e: sqlx::Error| StorageError::Backend(e.to_string());
    Ok(EditLock {
        article_id: ArticleId::new(row.try_get::<String, _>("article_id").map_err(backend)?),
        holder_id: UserId::new(row.try_get::<String, _>("holder_id").map_err(backend)?),
        acquired_at: row.try_get("acquired_at").map_err(backend)?,
        expires_at: row.try_get("expires_at").map_err(backend)?,
    })
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

fn to_i64(value: u64) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| StorageError::InvalidInput("value too large".to_string()))
}

/// `LIMIT NULL` means no limit in PostgreSQL.
fn limit_of(window: QueryWindow) -> StorageResult<Option<i64>> {
    if window.limit == 0 {
        Ok(None)
    } else {
        to_i64(window.limit as u64).map(Some)
    }
}
