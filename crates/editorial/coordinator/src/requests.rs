use chrono::{DateTime, Utc};
use editorial_types::{EditLock, UserId};
use serde::{Deserialize, Serialize};

/// Input for creating an article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub contributors: Vec<UserId>,
}

impl NewArticle {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            contributors: Vec::new(),
        }
    }

    pub fn with_contributor(mut self, user_id: UserId) -> Self {
        self.contributors.push(user_id);
        self
    }
}

/// A content edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Reject the edit if the article moved past this version
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl ContentUpdate {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

/// Answer to an edit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "grant", rename_all = "snake_case")]
pub enum EditGrant {
    /// Drafts are edited by their authors without a lock
    NotRequired,
    Acquired { lock: EditLock },
    /// The caller already held the lock; its lease was extended
    AlreadyHeld { lock: EditLock },
    Denied {
        holder: UserId,
        expires_at: DateTime<Utc>,
    },
}

impl EditGrant {
    /// Whether the caller may start editing
    pub fn is_granted(&self) -> bool {
        !matches!(self, EditGrant::Denied { .. })
    }
}
