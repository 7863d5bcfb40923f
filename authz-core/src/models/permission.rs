//! Permission model - boolean capability flags and the static role table.

use serde::{Deserialize, Serialize};

use super::role::RoleName;

/// A single capability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CanManageUsers,
    CanEditProjects,
    CanViewReports,
    CanManageBilling,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CanManageUsers => "can_manage_users",
            Permission::CanEditProjects => "can_edit_projects",
            Permission::CanViewReports => "can_view_reports",
            Permission::CanManageBilling => "can_manage_billing",
        }
    }
}

/// The capability set derived from a role.
///
/// The role table is deliberately static rather than data-driven: the hot
/// permission-check path stays allocation-free and the whole table is
/// auditable at a glance. Adding a role means adding a match arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub can_manage_users: bool,
    pub can_edit_projects: bool,
    pub can_view_reports: bool,
    pub can_manage_billing: bool,
}

impl PermissionSet {
    /// The all-false set. This is the fail-closed default for any user who
    /// holds no role in the queried account.
    pub const NONE: PermissionSet = PermissionSet {
        can_manage_users: false,
        can_edit_projects: false,
        can_view_reports: false,
        can_manage_billing: false,
    };

    /// Static role -> permission table.
    pub const fn for_role(role: RoleName) -> PermissionSet {
        match role {
            RoleName::SuperAdmin => PermissionSet {
                can_manage_users: true,
                can_edit_projects: true,
                can_view_reports: true,
                can_manage_billing: true,
            },
            RoleName::Admin => PermissionSet {
                can_manage_users: false,
                can_edit_projects: true,
                can_view_reports: true,
                can_manage_billing: true,
            },
            RoleName::Editor => PermissionSet {
                can_manage_users: false,
                can_edit_projects: true,
                can_view_reports: true,
                can_manage_billing: false,
            },
            RoleName::Viewer => PermissionSet {
                can_manage_users: false,
                can_edit_projects: false,
                can_view_reports: true,
                can_manage_billing: false,
            },
        }
    }

    /// Whether this set allows the given permission.
    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::CanManageUsers => self.can_manage_users,
            Permission::CanEditProjects => self.can_edit_projects,
            Permission::CanViewReports => self.can_view_reports,
            Permission::CanManageBilling => self.can_manage_billing,
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        PermissionSet::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_has_every_permission() {
        let set = PermissionSet::for_role(RoleName::SuperAdmin);
        assert!(set.can_manage_users);
        assert!(set.can_edit_projects);
        assert!(set.can_view_reports);
        assert!(set.can_manage_billing);
    }

    #[test]
    fn admin_cannot_manage_users_but_manages_billing() {
        let set = PermissionSet::for_role(RoleName::Admin);
        assert!(!set.can_manage_users);
        assert!(set.can_edit_projects);
        assert!(set.can_view_reports);
        assert!(set.can_manage_billing);
    }

    #[test]
    fn editor_edits_projects_only() {
        let set = PermissionSet::for_role(RoleName::Editor);
        assert!(!set.can_manage_users);
        assert!(set.can_edit_projects);
        assert!(set.can_view_reports);
        assert!(!set.can_manage_billing);
    }

    #[test]
    fn viewer_is_read_only() {
        let set = PermissionSet::for_role(RoleName::Viewer);
        assert!(!set.can_manage_users);
        assert!(!set.can_edit_projects);
        assert!(set.can_view_reports);
        assert!(!set.can_manage_billing);
    }

    #[test]
    fn allows_matches_fields() {
        let set = PermissionSet::for_role(RoleName::Editor);
        assert!(set.allows(Permission::CanEditProjects));
        assert!(!set.allows(Permission::CanManageBilling));
    }

    #[test]
    fn default_set_denies_everything() {
        let set = PermissionSet::default();
        for permission in [
            Permission::CanManageUsers,
            Permission::CanEditProjects,
            Permission::CanViewReports,
            Permission::CanManageBilling,
        ] {
            assert!(!set.allows(permission));
        }
    }
}
