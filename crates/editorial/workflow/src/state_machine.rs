//! State machine: legal transitions and who may trigger them

use crate::stages::{review_stage, ReviewStage, PUBLISH_ROLE, UNPUBLISH_ROLE};
use editorial_types::{
    ArticleStatus, Authorship, Caller, EditorialError, EditorialResult, ReviewDecision,
    ReviewLevel, Role, WorkflowAction,
};
use serde::Serialize;

/// Who is allowed to trigger a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum Requirement {
    /// Owner or contributor of the article
    Author,
    /// Caller's highest rank must be at least this role
    Rank(Role),
}

/// A reviewer decision to record in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerDecision {
    pub level: ReviewLevel,
    pub decision: ReviewDecision,
}

/// Everything one accepted transition changes.
///
/// The coordinator commits all of it in a single conditional write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    pub action: WorkflowAction,
    pub from: ArticleStatus,
    pub to: ArticleStatus,
    /// Decision to record against the current stage's pending entry
    pub record: Option<LedgerDecision>,
    /// Level whose pending placeholder opens in the target status
    pub open_stage: Option<ReviewLevel>,
    /// Drop any live edit lock as part of the transition
    pub release_lock: bool,
    /// Advance the article's review cycle
    pub starts_cycle: bool,
}

/// Manages article state transitions and their rank gates
#[derive(Clone, Debug, Default)]
pub struct WorkflowStateMachine;

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Target status of `action` from `status`, if the edge exists
    pub fn target(&self, status: ArticleStatus, action: WorkflowAction) -> Option<ArticleStatus> {
        use ArticleStatus::*;
        match (status, action) {
            (Draft, WorkflowAction::Submit) => Some(Pending),
            (Rejected, WorkflowAction::Reopen) => Some(Draft),
            (ApprovedBySchoolAdmin, WorkflowAction::Approve | WorkflowAction::Publish) => {
                Some(Published)
            }
            (ApprovedBySchoolAdmin, WorkflowAction::Reject) => Some(Rejected),
            (Published, WorkflowAction::Unpublish) => Some(ApprovedBySchoolAdmin),
            (s, WorkflowAction::Approve) => review_stage(s).map(|stage| stage.approved_status),
            (s, WorkflowAction::Reject) => review_stage(s).map(|_| Rejected),
            _ => None,
        }
    }

    /// Who may trigger `action` from `status`, if the edge exists
    pub fn requirement(
        &self,
        status: ArticleStatus,
        action: WorkflowAction,
    ) -> Option<Requirement> {
        self.target(status, action)?;
        let requirement = match action {
            WorkflowAction::Submit | WorkflowAction::Reopen => Requirement::Author,
            WorkflowAction::Unpublish => Requirement::Rank(UNPUBLISH_ROLE),
            WorkflowAction::Publish => Requirement::Rank(PUBLISH_ROLE),
            WorkflowAction::Approve | WorkflowAction::Reject => match review_stage(status) {
                Some(stage) => Requirement::Rank(stage.required_role),
                None => Requirement::Rank(PUBLISH_ROLE),
            },
        };
        Some(requirement)
    }

    /// Validate a transition request and describe its effects.
    ///
    /// Undefined edges fail with `InvalidTransition` before any authorization
    /// check; defined edges the caller may not take fail with `Authorization`.
    pub fn plan(
        &self,
        status: ArticleStatus,
        action: WorkflowAction,
        caller: &Caller,
        authorship: Authorship,
    ) -> EditorialResult<TransitionPlan> {
        let (to, requirement) = match (self.target(status, action), self.requirement(status, action))
        {
            (Some(to), Some(requirement)) => (to, requirement),
            _ => return Err(EditorialError::InvalidTransition { status, action }),
        };

        if !Self::permits(requirement, caller, authorship) {
            tracing::debug!(
                user = %caller.user_id,
                rank = %caller.rank(),
                %status,
                %action,
                ?requirement,
                "Transition denied"
            );
            return Err(EditorialError::Authorization(match requirement {
                Requirement::Author => format!(
                    "only the owner or a contributor may {} this article",
                    action
                ),
                Requirement::Rank(role) => format!(
                    "{} requires rank {} in status {}, caller {} has {}",
                    action,
                    role,
                    status,
                    caller.user_id,
                    caller.rank()
                ),
            }));
        }

        let stage = review_stage(status);
        let plan = match action {
            WorkflowAction::Submit => TransitionPlan {
                action,
                from: status,
                to,
                record: None,
                open_stage: review_stage(to).map(|s| s.level),
                release_lock: false,
                starts_cycle: true,
            },
            WorkflowAction::Reopen | WorkflowAction::Unpublish => TransitionPlan {
                action,
                from: status,
                to,
                record: None,
                open_stage: None,
                release_lock: false,
                starts_cycle: false,
            },
            WorkflowAction::Approve | WorkflowAction::Publish => TransitionPlan {
                action,
                from: status,
                to,
                record: stage.map(|s| decision(s, ReviewDecision::Approved)),
                open_stage: review_stage(to).map(|s| s.level),
                release_lock: to == ArticleStatus::Published,
                starts_cycle: false,
            },
            WorkflowAction::Reject => TransitionPlan {
                action,
                from: status,
                to,
                record: Some(LedgerDecision {
                    level: stage.map_or(ReviewLevel::SchoolAdmin, |s| s.level),
                    decision: ReviewDecision::Rejected,
                }),
                open_stage: None,
                release_lock: true,
                starts_cycle: false,
            },
        };

        Ok(plan)
    }

    /// Actions `caller` could successfully request from `status`
    pub fn available_actions(
        &self,
        status: ArticleStatus,
        caller: &Caller,
        authorship: Authorship,
    ) -> Vec<WorkflowAction> {
        WorkflowAction::ALL
            .into_iter()
            .filter(|action| self.plan(status, *action, caller, authorship).is_ok())
            .collect()
    }

    /// Whether `from -> to` is an edge of the workflow graph
    pub fn is_edge(&self, from: ArticleStatus, to: ArticleStatus) -> bool {
        WorkflowAction::ALL
            .into_iter()
            .any(|action| self.target(from, action) == Some(to))
    }

    /// Content edits in this status need the caller's live edit lock
    pub fn requires_lock(&self, status: ArticleStatus) -> bool {
        status.is_under_review()
    }

    /// Content may be changed at all in this status
    pub fn is_editable(&self, status: ArticleStatus) -> bool {
        matches!(status, ArticleStatus::Draft) || status.is_under_review()
    }

    fn permits(requirement: Requirement, caller: &Caller, authorship: Authorship) -> bool {
        match requirement {
            Requirement::Author => authorship.is_author(),
            Requirement::Rank(role) => caller.roles.satisfies(role),
        }
    }
}

fn decision(stage: &ReviewStage, decision: ReviewDecision) -> LedgerDecision {
    LedgerDecision {
        level: stage.level,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn caller(role: Role) -> Caller {
        Caller::with_role("caller", role)
    }

    #[test]
    fn test_submit_requires_authorship() {
        let sm = WorkflowStateMachine::new();
        let plan = sm
            .plan(
                ArticleStatus::Draft,
                WorkflowAction::Submit,
                &caller(Role::Contributor),
                Authorship::Owner,
            )
            .unwrap();
        assert_eq!(plan.to, ArticleStatus::Pending);
        assert!(plan.starts_cycle);
        assert_eq!(plan.open_stage, Some(ReviewLevel::UnitEditor));

        let denied = sm.plan(
            ArticleStatus::Draft,
            WorkflowAction::Submit,
            &caller(Role::SystemAdmin),
            Authorship::None,
        );
        assert!(matches!(denied, Err(EditorialError::Authorization(_))));
    }

    #[test]
    fn test_contributor_may_submit() {
        let sm = WorkflowStateMachine::new();
        assert!(sm
            .plan(
                ArticleStatus::Draft,
                WorkflowAction::Submit,
                &caller(Role::User),
                Authorship::Contributor,
            )
            .is_ok());
    }

    #[test]
    fn test_approve_chain_records_and_opens() {
        let sm = WorkflowStateMachine::new();
        let plan = sm
            .plan(
                ArticleStatus::Pending,
                WorkflowAction::Approve,
                &caller(Role::Editor),
                Authorship::None,
            )
            .unwrap();
        assert_eq!(plan.to, ArticleStatus::ApprovedByUnitEditor);
        assert_eq!(
            plan.record,
            Some(LedgerDecision {
                level: ReviewLevel::UnitEditor,
                decision: ReviewDecision::Approved
            })
        );
        assert_eq!(plan.open_stage, Some(ReviewLevel::UnitLeader));
        assert!(!plan.release_lock);

        let last = sm
            .plan(
                ArticleStatus::ApprovedByUnitAdmin,
                WorkflowAction::Approve,
                &caller(Role::SchoolAdmin),
                Authorship::None,
            )
            .unwrap();
        assert_eq!(last.to, ArticleStatus::ApprovedBySchoolAdmin);
        assert_eq!(last.open_stage, None);
    }

    #[test]
    fn test_out_of_rank_is_authorization_error() {
        let sm = WorkflowStateMachine::new();
        let result = sm.plan(
            ArticleStatus::ApprovedByUnitEditor,
            WorkflowAction::Approve,
            &caller(Role::Editor),
            Authorship::Owner,
        );
        assert!(matches!(result, Err(EditorialError::Authorization(_))));
    }

    #[test]
    fn test_higher_rank_may_act_at_lower_stage() {
        let sm = WorkflowStateMachine::new();
        assert!(sm
            .plan(
                ArticleStatus::Pending,
                WorkflowAction::Reject,
                &caller(Role::SchoolAdmin),
                Authorship::None,
            )
            .is_ok());
    }

    #[test]
    fn test_undefined_edge_is_invalid_transition() {
        let sm = WorkflowStateMachine::new();
        let result = sm.plan(
            ArticleStatus::Pending,
            WorkflowAction::Publish,
            &caller(Role::SystemAdmin),
            Authorship::None,
        );
        assert_eq!(
            result,
            Err(EditorialError::InvalidTransition {
                status: ArticleStatus::Pending,
                action: WorkflowAction::Publish,
            })
        );

        // undefined edges win over authorization
        let result = sm.plan(
            ArticleStatus::Published,
            WorkflowAction::Approve,
            &caller(Role::User),
            Authorship::None,
        );
        assert!(matches!(result, Err(EditorialError::InvalidTransition { .. })));
    }

    #[test]
    fn test_publish_releases_lock() {
        let sm = WorkflowStateMachine::new();
        for action in [WorkflowAction::Publish, WorkflowAction::Approve] {
            let plan = sm
                .plan(
                    ArticleStatus::ApprovedBySchoolAdmin,
                    action,
                    &caller(Role::SchoolAdmin),
                    Authorship::None,
                )
                .unwrap();
            assert_eq!(plan.to, ArticleStatus::Published);
            assert!(plan.release_lock);
            assert_eq!(plan.record, None);
        }
    }

    #[test]
    fn test_reject_records_and_releases() {
        let sm = WorkflowStateMachine::new();
        let plan = sm
            .plan(
                ArticleStatus::ApprovedByUnitEditor,
                WorkflowAction::Reject,
                &caller(Role::Leader),
                Authorship::None,
            )
            .unwrap();
        assert_eq!(plan.to, ArticleStatus::Rejected);
        assert!(plan.release_lock);
        assert_eq!(
            plan.record.map(|r| (r.level, r.decision)),
            Some((ReviewLevel::UnitLeader, ReviewDecision::Rejected))
        );
    }

    #[test]
    fn test_final_stage_reject_records_school_admin() {
        let sm = WorkflowStateMachine::new();
        assert_eq!(
            sm.target(ArticleStatus::ApprovedBySchoolAdmin, WorkflowAction::Reject),
            Some(ArticleStatus::Rejected)
        );
        assert_eq!(
            sm.requirement(ArticleStatus::ApprovedBySchoolAdmin, WorkflowAction::Reject),
            Some(Requirement::Rank(PUBLISH_ROLE))
        );

        let plan = sm
            .plan(
                ArticleStatus::ApprovedBySchoolAdmin,
                WorkflowAction::Reject,
                &caller(Role::SchoolAdmin),
                Authorship::None,
            )
            .unwrap();
        assert_eq!(plan.to, ArticleStatus::Rejected);
        assert!(plan.release_lock);
        assert!(!plan.starts_cycle);
        assert_eq!(
            plan.record,
            Some(LedgerDecision {
                level: ReviewLevel::SchoolAdmin,
                decision: ReviewDecision::Rejected
            })
        );

        let denied = sm.plan(
            ArticleStatus::ApprovedBySchoolAdmin,
            WorkflowAction::Reject,
            &caller(Role::UnitAdmin),
            Authorship::Owner,
        );
        assert!(matches!(denied, Err(EditorialError::Authorization(_))));
    }

    #[test]
    fn test_unpublish_rank() {
        let sm = WorkflowStateMachine::new();
        assert!(sm
            .plan(
                ArticleStatus::Published,
                WorkflowAction::Unpublish,
                &caller(Role::Leader),
                Authorship::Owner,
            )
            .is_err());
        let plan = sm
            .plan(
                ArticleStatus::Published,
                WorkflowAction::Unpublish,
                &caller(Role::UnitAdmin),
                Authorship::None,
            )
            .unwrap();
        assert_eq!(plan.to, ArticleStatus::ApprovedBySchoolAdmin);
    }

    #[test]
    fn test_available_actions() {
        let sm = WorkflowStateMachine::new();
        let actions =
            sm.available_actions(ArticleStatus::Pending, &caller(Role::Editor), Authorship::None);
        assert_eq!(actions, vec![WorkflowAction::Approve, WorkflowAction::Reject]);

        let actions =
            sm.available_actions(ArticleStatus::Draft, &caller(Role::User), Authorship::Owner);
        assert_eq!(actions, vec![WorkflowAction::Submit]);
    }

    #[test]
    fn test_lock_and_edit_windows() {
        let sm = WorkflowStateMachine::new();
        assert!(!sm.requires_lock(ArticleStatus::Draft));
        assert!(sm.requires_lock(ArticleStatus::ApprovedBySchoolAdmin));
        assert!(!sm.is_editable(ArticleStatus::Published));
        assert!(!sm.is_editable(ArticleStatus::Rejected));
        assert!(sm.is_editable(ArticleStatus::Draft));
    }

    fn arb_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::ALL.to_vec())
    }

    fn arb_action() -> impl Strategy<Value = WorkflowAction> {
        proptest::sample::select(WorkflowAction::ALL.to_vec())
    }

    fn arb_authorship() -> impl Strategy<Value = Authorship> {
        prop_oneof![
            Just(Authorship::Owner),
            Just(Authorship::Contributor),
            Just(Authorship::None),
        ]
    }

    proptest! {
        /// Every accepted transition is an edge of the graph, and approval
        /// stages are never skipped.
        #[test]
        fn property_walks_follow_the_graph(
            steps in prop::collection::vec((arb_action(), arb_role(), arb_authorship()), 0..64)
        ) {
            let sm = WorkflowStateMachine::new();
            let mut status = ArticleStatus::Draft;
            let mut history = vec![status];

            for (action, role, authorship) in steps {
                if let Ok(plan) = sm.plan(status, action, &caller(role), authorship) {
                    prop_assert_eq!(plan.from, status);
                    prop_assert!(sm.is_edge(status, plan.to));
                    status = plan.to;
                    history.push(status);
                }
            }

            for pair in history.windows(2) {
                prop_assert!(!(pair[0] == ArticleStatus::Pending
                    && pair[1] == ArticleStatus::Published));
                prop_assert!(!(pair[0] == ArticleStatus::Draft
                    && pair[1] != ArticleStatus::Pending));
            }
        }

        /// Rank-gated transitions succeed exactly when the caller's rank
        /// meets the requirement.
        #[test]
        fn property_rank_gating(
            status in proptest::sample::select(ArticleStatus::ALL.to_vec()),
            action in arb_action(),
            role in arb_role(),
        ) {
            let sm = WorkflowStateMachine::new();
            let result = sm.plan(status, action, &caller(role), Authorship::None);

            match sm.requirement(status, action) {
                None => {
                    let is_invalid = matches!(result, Err(EditorialError::InvalidTransition { .. }));
                    prop_assert!(is_invalid);
                }
                Some(Requirement::Author) => {
                    let is_denied = matches!(result, Err(EditorialError::Authorization(_)));
                    prop_assert!(is_denied);
                }
                Some(Requirement::Rank(required)) => {
                    if role >= required {
                        prop_assert!(result.is_ok());
                    } else {
                        let is_denied = matches!(result, Err(EditorialError::Authorization(_)));
                        prop_assert!(is_denied);
                    }
                }
            }
        }
    }
}
