//! Role model - the closed set of role names this core recognizes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A role name from the closed set.
///
/// Role names read back from storage are parsed through [`RoleName::parse_known`];
/// anything outside this set is treated as "no role" rather than surfaced, so a
/// partially migrated or corrupted grant row can never widen access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    SuperAdmin,
    Admin,
    Editor,
    Viewer,
}

impl RoleName {
    /// All roles, strongest first.
    pub const ALL: [RoleName; 4] = [
        RoleName::SuperAdmin,
        RoleName::Admin,
        RoleName::Editor,
        RoleName::Viewer,
    ];

    /// Roles that may be granted through an invitation. Super-admin is
    /// deliberately excluded; it is only ever granted in the root group.
    pub const ASSIGNABLE: [RoleName; 3] = [RoleName::Admin, RoleName::Editor, RoleName::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::SuperAdmin => "super_admin",
            RoleName::Admin => "admin",
            RoleName::Editor => "editor",
            RoleName::Viewer => "viewer",
        }
    }

    /// Parse a stored role name, returning `None` for anything outside the
    /// closed set.
    pub fn parse_known(name: &str) -> Option<RoleName> {
        match name {
            "super_admin" => Some(RoleName::SuperAdmin),
            "admin" => Some(RoleName::Admin),
            "editor" => Some(RoleName::Editor),
            "viewer" => Some(RoleName::Viewer),
            _ => None,
        }
    }

    /// Whether this role may be granted through an invitation.
    pub fn is_assignable(&self) -> bool {
        Self::ASSIGNABLE.contains(self)
    }

    /// Precedence rank, lower is stronger. Used to pick the effective role
    /// when a user somehow holds more than one grant in a group.
    pub fn rank(&self) -> u8 {
        match self {
            RoleName::SuperAdmin => 0,
            RoleName::Admin => 1,
            RoleName::Editor => 2,
            RoleName::Viewer => 3,
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_round_trips_every_role() {
        for role in RoleName::ALL {
            assert_eq!(RoleName::parse_known(role.as_str()), Some(role));
        }
    }

    #[test]
    fn parse_known_rejects_unknown_names() {
        assert_eq!(RoleName::parse_known("owner"), None);
        assert_eq!(RoleName::parse_known("ADMIN"), None);
        assert_eq!(RoleName::parse_known(""), None);
    }

    #[test]
    fn super_admin_is_not_assignable() {
        assert!(!RoleName::SuperAdmin.is_assignable());
        for role in RoleName::ASSIGNABLE {
            assert!(role.is_assignable());
        }
    }
}
