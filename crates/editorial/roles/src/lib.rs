//! Role Resolver - group memberships to ranked roles
//!
//! The identity provider hands every request a caller id and a set of
//! group memberships. The resolver turns those groups into a [`RoleSet`]
//! and never consults anything the client sent about its own roles.
//!
//! Resolution order for each group:
//! 1. the explicit mapping table in [`RoleMapping`]
//! 2. the naming convention, where the last path segment of the group
//!    (`/units/law/editor`) names the role
//!
//! Groups matching neither are ignored. Every caller holds `USER`.

#![deny(unsafe_code)]

use editorial_types::{Caller, Role, RoleSet, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Group-to-role mapping, usually loaded from the `roles` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMapping {
    /// Exact group name -> role
    #[serde(default)]
    pub groups: HashMap<String, Role>,

    /// Fall back to the path-suffix convention for unmapped groups
    #[serde(default = "default_true")]
    pub use_naming_convention: bool,
}

fn default_true() -> bool {
    true
}

impl RoleMapping {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            use_naming_convention: true,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>, role: Role) -> Self {
        self.groups.insert(group.into(), role);
        self
    }

    pub fn without_naming_convention(mut self) -> Self {
        self.use_naming_convention = false;
        self
    }
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self::new()
    }
}

/// Derives a caller's roles from group memberships
#[derive(Debug, Clone)]
pub struct RoleResolver {
    mapping: RoleMapping,
}

impl RoleResolver {
    pub fn new(mapping: RoleMapping) -> Self {
        Self { mapping }
    }

    /// Resolve the full role set for a set of groups
    pub fn roles_for<I, S>(&self, groups: I) -> RoleSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles = RoleSet::new();
        for group in groups {
            let group = group.as_ref().trim();
            if group.is_empty() {
                continue;
            }
            match self.role_for_group(group) {
                Some(role) => roles.insert(role),
                None => tracing::debug!(group, "Ignoring group with no role mapping"),
            }
        }
        roles
    }

    /// Build the [`Caller`] a request runs as
    pub fn resolve<I, S>(&self, caller_id: impl Into<String>, groups: I) -> Caller
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let user_id = UserId::new(caller_id);
        let roles = self.roles_for(groups);
        tracing::trace!(user = %user_id, rank = %roles.highest(), "Resolved caller roles");
        Caller::new(user_id, roles)
    }

    fn role_for_group(&self, group: &str) -> Option<Role> {
        if let Some(role) = self.mapping.groups.get(group) {
            return Some(*role);
        }
        if !self.mapping.use_naming_convention {
            return None;
        }
        conventional_role(group)
    }
}

impl Default for RoleResolver {
    fn default() -> Self {
        Self::new(RoleMapping::new())
    }
}

/// Parse the role named by the last path segment of a group.
///
/// `/units/law/unit-admin`, `unit_admin` and `UNIT-ADMIN` all name
/// [`Role::UnitAdmin`]. Plural segments (`editors`) are accepted.
fn conventional_role(group: &str) -> Option<Role> {
    let segment = group
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(group);

    if let Ok(role) = segment.parse::<Role>() {
        return Some(role);
    }
    segment
        .strip_suffix('s')
        .and_then(|singular| singular.parse::<Role>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_caller_is_user() {
        let caller = RoleResolver::default().resolve("u1", Vec::<String>::new());
        assert_eq!(caller.rank(), Role::User);
        assert_eq!(caller.user_id, UserId::new("u1"));
    }

    #[test]
    fn test_naming_convention() {
        let resolver = RoleResolver::default();
        let roles = resolver.roles_for(["/units/law/editor", "/units/law/contributors"]);
        assert!(roles.contains(Role::Editor));
        assert!(roles.contains(Role::Contributor));
        assert_eq!(roles.highest(), Role::Editor);
    }

    #[test]
    fn test_explicit_mapping_wins() {
        let mapping = RoleMapping::new().with_group("/faculty/deans-office", Role::SchoolAdmin);
        let resolver = RoleResolver::new(mapping);
        let roles = resolver.roles_for(["/faculty/deans-office"]);
        assert_eq!(roles.highest(), Role::SchoolAdmin);
    }

    #[test]
    fn test_highest_of_multiple_memberships() {
        let resolver = RoleResolver::default();
        let caller = resolver.resolve(
            "u2",
            ["/units/a/contributor", "/units/b/leader", "/units/c/editor"],
        );
        assert_eq!(caller.rank(), Role::Leader);
    }

    #[test]
    fn test_unknown_and_blank_groups_ignored() {
        let resolver = RoleResolver::default();
        let roles = resolver.roles_for(["/alumni", "", "  ", "/units/x/dean"]);
        assert_eq!(roles.highest(), Role::User);
    }

    #[test]
    fn test_convention_can_be_disabled() {
        let resolver = RoleResolver::new(RoleMapping::new().without_naming_convention());
        let roles = resolver.roles_for(["/units/law/system-admin"]);
        assert_eq!(roles.highest(), Role::User);
    }

    #[test]
    fn test_mapping_deserializes_from_config() {
        let mapping: RoleMapping = serde_json::from_str(
            r#"{ "groups": { "cms-publishers": "SCHOOL_ADMIN" } }"#,
        )
        .unwrap();
        assert!(mapping.use_naming_convention);
        assert_eq!(mapping.groups.get("cms-publishers"), Some(&Role::SchoolAdmin));
    }
}
