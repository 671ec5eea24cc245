//! Workflow actions a caller can request

use crate::{EditorialError, ReviewDecision};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A requested state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
    /// `DRAFT -> PENDING`, by an author
    Submit,
    /// `REJECTED -> DRAFT`, by an author
    Reopen,
    /// Advance one review stage
    Approve,
    /// Send any status under review to `REJECTED`
    Reject,
    /// `APPROVED_BY_SCHOOL_ADMIN -> PUBLISHED`
    Publish,
    /// `PUBLISHED -> APPROVED_BY_SCHOOL_ADMIN`
    Unpublish,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 6] = [
        WorkflowAction::Submit,
        WorkflowAction::Reopen,
        WorkflowAction::Approve,
        WorkflowAction::Reject,
        WorkflowAction::Publish,
        WorkflowAction::Unpublish,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::Submit => "SUBMIT",
            WorkflowAction::Reopen => "REOPEN",
            WorkflowAction::Approve => "APPROVE",
            WorkflowAction::Reject => "REJECT",
            WorkflowAction::Publish => "PUBLISH",
            WorkflowAction::Unpublish => "UNPUBLISH",
        }
    }

    /// The reviewer action matching a final decision
    pub fn from_decision(decision: ReviewDecision) -> Result<Self, EditorialError> {
        match decision {
            ReviewDecision::Approved => Ok(WorkflowAction::Approve),
            ReviewDecision::Rejected => Ok(WorkflowAction::Reject),
            ReviewDecision::Pending => Err(EditorialError::Validation(
                "a pending decision cannot be submitted".to_string(),
            )),
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowAction {
    type Err = EditorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        WorkflowAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| EditorialError::Validation(format!("unknown workflow action: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_name() {
        for action in WorkflowAction::ALL {
            let wire = serde_json::to_value(action).unwrap();
            assert_eq!(wire, serde_json::Value::String(action.to_string()));
        }
        assert_eq!(WorkflowAction::Unpublish.to_string(), "UNPUBLISH");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("submit".parse::<WorkflowAction>().unwrap(), WorkflowAction::Submit);
        assert_eq!(" REOPEN ".parse::<WorkflowAction>().unwrap(), WorkflowAction::Reopen);
        assert!("withdraw".parse::<WorkflowAction>().is_err());
    }
}
