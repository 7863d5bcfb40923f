//! RBAC engine - permission and accessibility queries.
//!
//! Pure derivations over the membership resolver and the static role table;
//! holds no state of its own. Every permission-check entry point fails
//! closed: a store error or missing data yields "no permission", never a
//! propagated error a caller might mishandle as "allow".

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Account, Permission, PermissionSet, RoleName, User};
use crate::services::error::AuthzError;
use crate::services::membership::MembershipResolver;
use crate::store::Store;

/// Answers access-control queries for (user, account) pairs.
#[derive(Clone)]
pub struct RbacEngine {
    store: Arc<dyn Store>,
    resolver: MembershipResolver,
}

impl RbacEngine {
    pub fn new(store: Arc<dyn Store>, resolver: MembershipResolver) -> Self {
        Self { store, resolver }
    }

    /// Static role -> permission table lookup.
    pub fn get_role_permissions(&self, role: RoleName) -> PermissionSet {
        PermissionSet::for_role(role)
    }

    /// The user's permission set in the account. All-false when the user
    /// holds no role there, the account does not exist, or resolution fails.
    pub async fn get_user_permissions(&self, user_id: Uuid, account_id: Uuid) -> PermissionSet {
        match self.resolver.resolve_role(user_id, account_id).await {
            Ok(Some(role)) => PermissionSet::for_role(role),
            Ok(None) => PermissionSet::NONE,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    account_id = %account_id,
                    error = %e,
                    "Role resolution failed, denying all permissions"
                );
                PermissionSet::NONE
            }
        }
    }

    pub async fn user_has_permission(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        permission: Permission,
    ) -> bool {
        self.get_user_permissions(user_id, account_id)
            .await
            .allows(permission)
    }

    /// The user's effective role in the account, `None` when they have none
    /// or resolution fails.
    pub async fn get_user_role_in_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Option<RoleName> {
        match self.resolver.resolve_role(user_id, account_id).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(user_id = %user_id, account_id = %account_id, error = %e, "Role resolution failed");
                None
            }
        }
    }

    /// Fail-closed super-admin check.
    pub async fn is_super_admin(&self, user_id: Uuid) -> bool {
        match self.resolver.is_super_admin(user_id).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Super-admin check failed, denying");
                false
            }
        }
    }

    /// True iff the account is among the user's accessible accounts:
    /// super-admins always, everyone else only for their own account.
    pub async fn can_access_account(&self, user_id: Uuid, account_id: Uuid) -> bool {
        match self.resolver.list_accessible_accounts(user_id).await {
            Ok(accounts) => accounts.iter().any(|a| a.account_id == account_id),
            Err(e) => {
                tracing::warn!(user_id = %user_id, account_id = %account_id, error = %e, "Accessibility check failed, denying");
                false
            }
        }
    }

    /// Accounts the user can access. Enumeration is an administrative read,
    /// so unlike the check entry points it propagates errors.
    pub async fn list_accessible_accounts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Account>, AuthzError> {
        self.resolver.list_accessible_accounts(user_id).await
    }

    /// Users holding any of the known roles in the account, with that role.
    /// Stray role rows outside the closed set are filtered out.
    pub async fn list_account_users_with_roles(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<(User, RoleName)>, AuthzError> {
        let Some(group) = self.store.group_for_account(account_id).await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .store
            .users_with_roles_in_group(group.group_id)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(user, name)| RoleName::parse_known(&name).map(|role| (user, role)))
            .collect())
    }
}
