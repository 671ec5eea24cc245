use chrono::{DateTime, Utc};
use editorial_types::{ArticleId, ArticleStatus, UserId, WorkflowAction};
use serde::{Deserialize, Serialize};

/// Something that happened to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    Created {
        article_id: ArticleId,
        owner_id: UserId,
        at: DateTime<Utc>,
    },
    Transitioned {
        article_id: ArticleId,
        action: WorkflowAction,
        from: ArticleStatus,
        to: ArticleStatus,
        actor: UserId,
        at: DateTime<Utc>,
    },
    LockAcquired {
        article_id: ArticleId,
        holder: UserId,
        expires_at: DateTime<Utc>,
    },
    LockReleased {
        article_id: ArticleId,
        holder: UserId,
    },
    ContentUpdated {
        article_id: ArticleId,
        editor: UserId,
        version: u64,
    },
    Deleted {
        article_id: ArticleId,
        actor: UserId,
        at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    pub fn article_id(&self) -> &ArticleId {
        match self {
            WorkflowEvent::Created { article_id, .. }
            | WorkflowEvent::Transitioned { article_id, .. }
            | WorkflowEvent::LockAcquired { article_id, .. }
            | WorkflowEvent::LockReleased { article_id, .. }
            | WorkflowEvent::ContentUpdated { article_id, .. }
            | WorkflowEvent::Deleted { article_id, .. } => article_id,
        }
    }
}
