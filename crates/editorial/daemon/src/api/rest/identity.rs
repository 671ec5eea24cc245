//! Caller identity from gateway headers
//!
//! The gateway authenticates the user and forwards `x-caller-id` plus the
//! identity-provider groups in `x-caller-groups`. Roles are always derived
//! here; a request cannot name its own roles.

use super::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use editorial_types::Caller;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_GROUPS_HEADER: &str = "x-caller-groups";

/// Resolve the request's caller, or 401 without a caller id.
pub fn caller_from_headers(state: &AppState, headers: &HeaderMap) -> ApiResult<Caller> {
    let caller_id = headers
        .get(CALLER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {} header", CALLER_ID_HEADER)))?;

    let groups = headers
        .get_all(CALLER_GROUPS_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|g| !g.is_empty());

    let caller = state.resolver.resolve(caller_id, groups);
    tracing::debug!(caller = %caller.user_id, rank = %caller.rank(), "caller resolved");
    Ok(caller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use editorial_coordinator::WorkflowCoordinator;
    use editorial_roles::{RoleMapping, RoleResolver};
    use editorial_types::Role;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            Arc::new(WorkflowCoordinator::in_memory().unwrap()),
            Arc::new(RoleResolver::new(
                RoleMapping::new().with_group("cms-unit-editors", Role::Editor),
            )),
        )
    }

    #[test]
    fn test_missing_caller_id_is_unauthenticated() {
        let err = caller_from_headers(&state(), &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn test_groups_resolve_to_roles() {
        let mut headers = HeaderMap::new();
        headers.insert(CALLER_ID_HEADER, HeaderValue::from_static("alice"));
        headers.insert(
            CALLER_GROUPS_HEADER,
            HeaderValue::from_static("staff, cms-unit-editors"),
        );

        let caller = caller_from_headers(&state(), &headers).unwrap();
        assert_eq!(caller.user_id.as_str(), "alice");
        assert!(caller.roles.contains(Role::Editor));
    }
}
