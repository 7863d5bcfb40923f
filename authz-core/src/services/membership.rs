//! Membership resolver - role resolution and grant/revoke mutations.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Account, RoleName};
use crate::services::clock::Clock;
use crate::services::error::AuthzError;
use crate::store::Store;

/// Resolves a user's role within an account and mutates role grants.
///
/// Resolution never distinguishes "account missing" from "user lacks
/// access": both come back as no role, so callers cannot probe for tenant
/// existence.
#[derive(Clone)]
pub struct MembershipResolver {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl MembershipResolver {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The user's effective role in the account, if any.
    ///
    /// Role names outside the closed set are ignored. If a user somehow
    /// holds several grants in the group, the strongest wins.
    pub async fn resolve_role(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<RoleName>, AuthzError> {
        let Some(group) = self.store.group_for_account(account_id).await? else {
            return Ok(None);
        };

        let names = self
            .store
            .role_names_in_group(user_id, group.group_id)
            .await?;

        Ok(names
            .iter()
            .filter_map(|name| RoleName::parse_known(name))
            .min_by_key(|role| role.rank()))
    }

    /// Idempotently grant `role` to the user in the account's group,
    /// joining the group first if needed. Re-granting is a no-op success.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, account_id = %account_id, role = %role))]
    pub async fn grant_role(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        role: RoleName,
    ) -> Result<(), AuthzError> {
        let group = self
            .store
            .group_for_account(account_id)
            .await?
            .ok_or(AuthzError::NotFound)?;

        self.store
            .grant_role(user_id, group.group_id, role, self.clock.now())
            .await?;

        tracing::info!(group_id = %group.group_id, "Role granted");
        Ok(())
    }

    /// Idempotently revoke `role` from the user in the account's group.
    /// Revoking an ungranted role, or against a missing account, is a no-op
    /// success. Group membership survives revocation.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, account_id = %account_id, role = %role))]
    pub async fn revoke_role(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        role: RoleName,
    ) -> Result<(), AuthzError> {
        let Some(group) = self.store.group_for_account(account_id).await? else {
            return Ok(());
        };

        self.store.revoke_role(user_id, group.group_id, role).await?;
        Ok(())
    }

    /// The one global, account-agnostic check: true iff the user holds a
    /// super-admin grant in any group (in practice only the root group).
    pub async fn is_super_admin(&self, user_id: Uuid) -> Result<bool, AuthzError> {
        self.store
            .holds_role_anywhere(user_id, RoleName::SuperAdmin)
            .await
    }

    /// Accounts the user may access: every account for a super-admin,
    /// otherwise at most the user's own primary account.
    pub async fn list_accessible_accounts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Account>, AuthzError> {
        if self.is_super_admin(user_id).await? {
            return self.store.list_accounts().await;
        }

        let Some(user) = self.store.find_user(user_id).await? else {
            return Ok(Vec::new());
        };
        let Some(account_id) = user.account_id else {
            return Ok(Vec::new());
        };

        Ok(self
            .store
            .find_account(account_id)
            .await?
            .into_iter()
            .collect())
    }
}
