//! Role hierarchy
//!
//! Roles form a total order. A caller may hold several roles at once (one
//! per group membership) but authorization only ever looks at the highest.

use crate::{EditorialError, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An organizational role. Declaration order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Contributor,
    Editor,
    Leader,
    UnitAdmin,
    SchoolAdmin,
    SystemAdmin,
}

impl Role {
    /// Every role, lowest rank first
    pub const ALL: [Role; 7] = [
        Role::User,
        Role::Contributor,
        Role::Editor,
        Role::Leader,
        Role::UnitAdmin,
        Role::SchoolAdmin,
        Role::SystemAdmin,
    ];

    /// Integer rank used for comparisons
    pub const fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Contributor => 1,
            Role::Editor => 2,
            Role::Leader => 3,
            Role::UnitAdmin => 4,
            Role::SchoolAdmin => 5,
            Role::SystemAdmin => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Contributor => "CONTRIBUTOR",
            Role::Editor => "EDITOR",
            Role::Leader => "LEADER",
            Role::UnitAdmin => "UNIT_ADMIN",
            Role::SchoolAdmin => "SCHOOL_ADMIN",
            Role::SystemAdmin => "SYSTEM_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EditorialError;

    /// Accepts `UNIT_ADMIN`, `unit-admin` and `unit_admin` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| EditorialError::Validation(format!("unknown role: {}", s)))
    }
}

/// The set of roles a caller holds. Always contains [`Role::User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// A role set holding only the baseline [`Role::User`]
    pub fn new() -> Self {
        let mut roles = BTreeSet::new();
        roles.insert(Role::User);
        Self(roles)
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// The highest-ranked role held
    pub fn highest(&self) -> Role {
        self.0.iter().next_back().copied().unwrap_or(Role::User)
    }

    /// Whether the highest role meets `required`
    pub fn satisfies(&self, required: Role) -> bool {
        self.highest() >= required
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

/// The identity a request runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub roles: RoleSet,
}

impl Caller {
    pub fn new(user_id: UserId, roles: RoleSet) -> Self {
        Self { user_id, roles }
    }

    /// Convenience constructor for a caller holding a single elevated role
    pub fn with_role(user_id: impl Into<String>, role: Role) -> Self {
        Self::new(UserId::new(user_id), RoleSet::new().with(role))
    }

    pub fn rank(&self) -> Role {
        self.roles.highest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order_is_total() {
        for pair in Role::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_role_parse_variants() {
        assert_eq!("unit-admin".parse::<Role>().unwrap(), Role::UnitAdmin);
        assert_eq!("SCHOOL_ADMIN".parse::<Role>().unwrap(), Role::SchoolAdmin);
        assert_eq!(" editor ".parse::<Role>().unwrap(), Role::Editor);
        assert!("dean".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_set_highest() {
        let roles: RoleSet = [Role::Editor, Role::Contributor].into_iter().collect();
        assert_eq!(roles.highest(), Role::Editor);
        assert!(roles.contains(Role::User));
        assert!(roles.satisfies(Role::Contributor));
        assert!(!roles.satisfies(Role::Leader));
    }

    #[test]
    fn test_empty_role_set_is_user() {
        assert_eq!(RoleSet::new().highest(), Role::User);
    }

    #[test]
    fn test_role_serde_format() {
        let json = serde_json::to_string(&Role::UnitAdmin).unwrap();
        assert_eq!(json, "\"UNIT_ADMIN\"");
    }
}
