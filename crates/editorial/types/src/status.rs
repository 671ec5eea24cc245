//! Workflow states, review levels and reviewer decisions

use crate::EditorialError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an article sits in the approval pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Draft,
    Pending,
    ApprovedByUnitEditor,
    ApprovedByUnitLeader,
    ApprovedByUnitAdmin,
    ApprovedBySchoolAdmin,
    Published,
    Rejected,
}

impl ArticleStatus {
    pub const ALL: [ArticleStatus; 8] = [
        ArticleStatus::Draft,
        ArticleStatus::Pending,
        ArticleStatus::ApprovedByUnitEditor,
        ArticleStatus::ApprovedByUnitLeader,
        ArticleStatus::ApprovedByUnitAdmin,
        ArticleStatus::ApprovedBySchoolAdmin,
        ArticleStatus::Published,
        ArticleStatus::Rejected,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Draft => "DRAFT",
            ArticleStatus::Pending => "PENDING",
            ArticleStatus::ApprovedByUnitEditor => "APPROVED_BY_UNIT_EDITOR",
            ArticleStatus::ApprovedByUnitLeader => "APPROVED_BY_UNIT_LEADER",
            ArticleStatus::ApprovedByUnitAdmin => "APPROVED_BY_UNIT_ADMIN",
            ArticleStatus::ApprovedBySchoolAdmin => "APPROVED_BY_SCHOOL_ADMIN",
            ArticleStatus::Published => "PUBLISHED",
            ArticleStatus::Rejected => "REJECTED",
        }
    }

    /// `PENDING` through `APPROVED_BY_SCHOOL_ADMIN` inclusive
    pub const fn is_under_review(self) -> bool {
        matches!(
            self,
            ArticleStatus::Pending
                | ArticleStatus::ApprovedByUnitEditor
                | ArticleStatus::ApprovedByUnitLeader
                | ArticleStatus::ApprovedByUnitAdmin
                | ArticleStatus::ApprovedBySchoolAdmin
        )
    }

    /// Soft deletion is only allowed from these states
    pub const fn is_deletable(self) -> bool {
        matches!(self, ArticleStatus::Draft | ArticleStatus::Rejected)
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = EditorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArticleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| EditorialError::Validation(format!("unknown article status: {}", s)))
    }
}

/// One checkpoint of the approval pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewLevel {
    UnitEditor,
    UnitLeader,
    UnitAdmin,
    SchoolAdmin,
}

impl ReviewLevel {
    pub const ALL: [ReviewLevel; 4] = [
        ReviewLevel::UnitEditor,
        ReviewLevel::UnitLeader,
        ReviewLevel::UnitAdmin,
        ReviewLevel::SchoolAdmin,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ReviewLevel::UnitEditor => "UNIT_EDITOR",
            ReviewLevel::UnitLeader => "UNIT_LEADER",
            ReviewLevel::UnitAdmin => "UNIT_ADMIN",
            ReviewLevel::SchoolAdmin => "SCHOOL_ADMIN",
        }
    }
}

impl fmt::Display for ReviewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewLevel {
    type Err = EditorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ReviewLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| EditorialError::Validation(format!("unknown review level: {}", s)))
    }
}

/// Outcome recorded against a review stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Pending,
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReviewDecision::Pending => "PENDING",
            ReviewDecision::Approved => "APPROVED",
            ReviewDecision::Rejected => "REJECTED",
        }
    }

    pub const fn is_final(self) -> bool {
        !matches!(self, ReviewDecision::Pending)
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewDecision {
    type Err = EditorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReviewDecision::Pending),
            "APPROVED" => Ok(ReviewDecision::Approved),
            "REJECTED" => Ok(ReviewDecision::Rejected),
            other => Err(EditorialError::Validation(format!(
                "unknown review decision: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in ArticleStatus::ALL {
            assert_eq!(status.as_str().parse::<ArticleStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_under_review_window() {
        assert!(!ArticleStatus::Draft.is_under_review());
        assert!(ArticleStatus::Pending.is_under_review());
        assert!(ArticleStatus::ApprovedBySchoolAdmin.is_under_review());
        assert!(!ArticleStatus::Published.is_under_review());
        assert!(!ArticleStatus::Rejected.is_under_review());
    }

    #[test]
    fn test_deletable_states() {
        let deletable: Vec<_> = ArticleStatus::ALL
            .into_iter()
            .filter(|s| s.is_deletable())
            .collect();
        assert_eq!(deletable, vec![ArticleStatus::Draft, ArticleStatus::Rejected]);
    }

    #[test]
    fn test_status_serde_matches_display() {
        let json = serde_json::to_string(&ArticleStatus::ApprovedByUnitLeader).unwrap();
        assert_eq!(json, "\"APPROVED_BY_UNIT_LEADER\"");
    }
}
