//! Review stage table
//!
//! Maps each status that awaits a reviewer decision to its review level,
//! the minimum rank allowed to decide, and the status an approval leads to.

use editorial_types::{ArticleStatus, ReviewLevel, Role};
use serde::Serialize;

/// One checkpoint of the review pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewStage {
    /// Status in which the stage awaits a decision
    pub status: ArticleStatus,
    /// Ledger level decisions at this stage are recorded under
    pub level: ReviewLevel,
    /// Minimum rank allowed to approve or reject
    pub required_role: Role,
    /// Status an approval advances to
    pub approved_status: ArticleStatus,
}

/// The four review stages, in pipeline order
pub const REVIEW_STAGES: [ReviewStage; 4] = [
    ReviewStage {
        status: ArticleStatus::Pending,
        level: ReviewLevel::UnitEditor,
        required_role: Role::Editor,
        approved_status: ArticleStatus::ApprovedByUnitEditor,
    },
    ReviewStage {
        status: ArticleStatus::ApprovedByUnitEditor,
        level: ReviewLevel::UnitLeader,
        required_role: Role::Leader,
        approved_status: ArticleStatus::ApprovedByUnitLeader,
    },
    ReviewStage {
        status: ArticleStatus::ApprovedByUnitLeader,
        level: ReviewLevel::UnitAdmin,
        required_role: Role::UnitAdmin,
        approved_status: ArticleStatus::ApprovedByUnitAdmin,
    },
    ReviewStage {
        status: ArticleStatus::ApprovedByUnitAdmin,
        level: ReviewLevel::SchoolAdmin,
        required_role: Role::SchoolAdmin,
        approved_status: ArticleStatus::ApprovedBySchoolAdmin,
    },
];

/// Rank required to publish from `APPROVED_BY_SCHOOL_ADMIN`
pub const PUBLISH_ROLE: Role = Role::SchoolAdmin;

/// Rank required to take a published article back into review
pub const UNPUBLISH_ROLE: Role = Role::UnitAdmin;

/// The review stage awaiting a decision in `status`, if any
pub fn review_stage(status: ArticleStatus) -> Option<&'static ReviewStage> {
    REVIEW_STAGES.iter().find(|stage| stage.status == status)
}

/// The stage recorded under `level`
pub fn stage_for_level(level: ReviewLevel) -> &'static ReviewStage {
    match level {
        ReviewLevel::UnitEditor => &REVIEW_STAGES[0],
        ReviewLevel::UnitLeader => &REVIEW_STAGES[1],
        ReviewLevel::UnitAdmin => &REVIEW_STAGES[2],
        ReviewLevel::SchoolAdmin => &REVIEW_STAGES[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_chain() {
        for pair in REVIEW_STAGES.windows(2) {
            assert_eq!(pair[0].approved_status, pair[1].status);
            assert!(pair[0].required_role < pair[1].required_role);
        }
        assert_eq!(
            REVIEW_STAGES[3].approved_status,
            ArticleStatus::ApprovedBySchoolAdmin
        );
    }

    #[test]
    fn test_stage_lookup() {
        let stage = review_stage(ArticleStatus::ApprovedByUnitEditor).unwrap();
        assert_eq!(stage.level, ReviewLevel::UnitLeader);
        assert_eq!(stage.required_role, Role::Leader);
        assert!(review_stage(ArticleStatus::Draft).is_none());
        assert!(review_stage(ArticleStatus::ApprovedBySchoolAdmin).is_none());

        for level in ReviewLevel::ALL {
            assert_eq!(stage_for_level(level).level, level);
        }
    }
}
