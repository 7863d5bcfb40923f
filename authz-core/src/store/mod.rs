//! Relational store capability.
//!
//! The [`Store`] trait is the single storage seam of the core. Multi-row
//! mutations are composite methods so every implementation can run them
//! inside one atomic transaction; there is no in-process locking, the store
//! is the only serialization point.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Account, FirstLoginToken, Group, Invite, NewAdminUser, Project, RoleName, User};
use crate::services::error::AuthzError;

/// Result of the tenant-provisioning transaction.
#[derive(Debug, Clone)]
pub struct ProvisionedTenant {
    pub account: Account,
    pub group: Group,
    pub project: Project,
    /// Present only for the immediate-admin flow.
    pub admin: Option<User>,
}

/// Transactional relational store.
///
/// Idempotent grant/revoke rely on unique constraints over
/// (user_id, group_id) and (membership_id, role_id): a duplicate-insert race
/// must resolve to "success, already granted", never a visible error.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AuthzError>;

    // ==================== Bootstrap ====================

    /// Ensure the single root group exists. Returns the group and whether
    /// this call created it. Safe to run concurrently; the loser of a
    /// create race reads the winner's row.
    async fn ensure_root_group(&self, now: DateTime<Utc>) -> Result<(Group, bool), AuthzError>;

    // ==================== Accounts / groups / projects ====================

    /// Create an account together with its backing group, atomically.
    async fn create_account(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(Account, Group), AuthzError>;

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, AuthzError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, AuthzError>;

    /// Resolve the backing group for an account. `None` when the account
    /// does not exist; role resolution treats that as "no role".
    async fn group_for_account(&self, account_id: Uuid) -> Result<Option<Group>, AuthzError>;

    async fn create_project(
        &self,
        account_id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Project, AuthzError>;

    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, AuthzError>;

    // ==================== Users ====================

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AuthzError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthzError>;

    async fn insert_user(&self, user: &User) -> Result<(), AuthzError>;

    // ==================== Tenant provisioning ====================

    /// Create an account, its group, and a project in one transaction. When
    /// `admin` is given, also create the admin user with
    /// `first_login_required = true` and grant them the admin role in the
    /// new account, all inside the same transaction.
    async fn create_tenant(
        &self,
        account_name: &str,
        project_name: &str,
        admin: Option<NewAdminUser>,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedTenant, AuthzError>;

    // ==================== Memberships and role grants ====================

    /// Idempotently ensure the user is a member of the group and holds the
    /// role there. Re-granting is a no-op success.
    async fn grant_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
        now: DateTime<Utc>,
    ) -> Result<(), AuthzError>;

    /// Idempotently remove the role grant. Membership is kept.
    async fn revoke_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
    ) -> Result<(), AuthzError>;

    /// Raw role names the user holds in the group. Callers filter through
    /// [`RoleName::parse_known`]; stray names must come back untouched.
    async fn role_names_in_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<String>, AuthzError>;

    /// Whether the user holds the role in any group at all. Used for the one
    /// account-agnostic check in the system, super-admin detection.
    async fn holds_role_anywhere(&self, user_id: Uuid, role: RoleName) -> Result<bool, AuthzError>;

    /// Users holding any role in the group, with the raw role name.
    async fn users_with_roles_in_group(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<(User, String)>, AuthzError>;

    // ==================== Invites ====================

    async fn insert_invite(&self, invite: &Invite) -> Result<(), AuthzError>;

    async fn find_invite_by_token(&self, token: &str) -> Result<Option<Invite>, AuthzError>;

    /// Accept an invite in one transaction: re-check used and expiry state
    /// under the transaction's lock (so a revoke racing the acceptance
    /// wins), claim `used_utc` with a first-writer-wins conditional update,
    /// find-or-create the user by the invite's email (an existing user has
    /// their password replaced), and grant the invite's role in the
    /// invite's account. Losing the claim returns
    /// [`AuthzError::AlreadyUsed`]; an invite past its expiry returns
    /// [`AuthzError::Expired`]. Either way nothing else is mutated.
    async fn accept_invite(
        &self,
        invite_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthzError>;

    /// Overwrite the invite's expiry. Revocation forces it into the past.
    async fn force_invite_expiry(
        &self,
        invite_id: Uuid,
        expiry_utc: DateTime<Utc>,
    ) -> Result<(), AuthzError>;

    /// All invites targeting the project, newest first.
    async fn invites_for_project(&self, project_id: Uuid) -> Result<Vec<Invite>, AuthzError>;

    // ==================== First-login tokens ====================

    async fn insert_first_login_token(&self, token: &FirstLoginToken) -> Result<(), AuthzError>;

    async fn find_first_login_token(
        &self,
        token: &str,
    ) -> Result<Option<FirstLoginToken>, AuthzError>;

    /// Consume the token in one transaction: delete the row, set the user's
    /// password, clear `first_login_required`. Returns `false` when the row
    /// was already gone, in which case nothing is mutated.
    async fn consume_first_login_token(
        &self,
        token_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AuthzError>;
}
