//! In-memory store implementation.
//!
//! A mutex-guarded set of tables with the same atomicity guarantees as the
//! Postgres store: every composite mutation happens under one lock
//! acquisition, so a partially applied accept or provisioning step is never
//! observable. Used by the test suite and useful for embedding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    Account, FirstLoginToken, Group, GroupMembership, Invite, NewAdminUser, Project, RoleName,
    User,
};
use crate::services::error::AuthzError;

use super::{ProvisionedTenant, Store};

#[derive(Default)]
struct Tables {
    groups: HashMap<Uuid, Group>,
    accounts: HashMap<Uuid, Account>,
    projects: HashMap<Uuid, Project>,
    users: HashMap<Uuid, User>,
    memberships: Vec<GroupMembership>,
    /// (membership_id, role_name); mirrors the unique (membership, role) pair.
    grants: HashSet<(Uuid, String)>,
    invites: HashMap<Uuid, Invite>,
    first_login_tokens: HashMap<Uuid, FirstLoginToken>,
}

impl Tables {
    fn root_group(&self) -> Option<Group> {
        self.groups.values().find(|g| g.is_root()).cloned()
    }

    fn membership(&self, user_id: Uuid, group_id: Uuid) -> Option<&GroupMembership> {
        self.memberships
            .iter()
            .find(|m| m.user_id == user_id && m.group_id == group_id)
    }

    fn ensure_membership(&mut self, user_id: Uuid, group_id: Uuid, now: DateTime<Utc>) -> Uuid {
        if let Some(existing) = self.membership(user_id, group_id) {
            return existing.membership_id;
        }
        let membership = GroupMembership::new(user_id, group_id, now);
        let id = membership.membership_id;
        self.memberships.push(membership);
        id
    }

    fn grant(&mut self, user_id: Uuid, group_id: Uuid, role: RoleName, now: DateTime<Utc>) {
        let membership_id = self.ensure_membership(user_id, group_id, now);
        self.grants.insert((membership_id, role.as_str().to_string()));
    }

    fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn provision_tenant(
        &mut self,
        account_name: &str,
        project_name: &str,
        admin: Option<NewAdminUser>,
        now: DateTime<Utc>,
    ) -> ProvisionedTenant {
        let parent = self.root_group().map(|g| g.group_id);
        let group = Group::new(account_name.to_string(), parent, now);
        let account = Account::new(group.group_id, now);
        let project = Project::new(account.account_id, project_name.to_string(), now);

        self.groups.insert(group.group_id, group.clone());
        self.accounts.insert(account.account_id, account.clone());
        self.projects.insert(project.project_id, project.clone());

        let admin_user = admin.map(|new_admin| {
            let user = User::new_pending_first_login(
                new_admin.email,
                new_admin.display_name,
                account.account_id,
                now,
            );
            self.users.insert(user.user_id, user.clone());
            self.grant(user.user_id, group.group_id, RoleName::Admin, now);
            user
        });

        ProvisionedTenant {
            account,
            group,
            project,
            admin: admin_user,
        }
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AuthzError> {
        Ok(())
    }

    async fn ensure_root_group(&self, now: DateTime<Utc>) -> Result<(Group, bool), AuthzError> {
        let mut tables = self.lock();
        if let Some(root) = tables.root_group() {
            return Ok((root, false));
        }
        let root = Group::new("root".to_string(), None, now);
        tables.groups.insert(root.group_id, root.clone());
        Ok((root, true))
    }

    async fn create_account(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(Account, Group), AuthzError> {
        let mut tables = self.lock();
        let parent = tables.root_group().map(|g| g.group_id);
        let group = Group::new(name.to_string(), parent, now);
        let account = Account::new(group.group_id, now);
        tables.groups.insert(group.group_id, group.clone());
        tables.accounts.insert(account.account_id, account.clone());
        Ok((account, group))
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, AuthzError> {
        Ok(self.lock().accounts.get(&account_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AuthzError> {
        let tables = self.lock();
        let mut accounts: Vec<Account> = tables.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.created_utc);
        Ok(accounts)
    }

    async fn group_for_account(&self, account_id: Uuid) -> Result<Option<Group>, AuthzError> {
        let tables = self.lock();
        let group = tables
            .accounts
            .get(&account_id)
            .and_then(|a| tables.groups.get(&a.group_id))
            .cloned();
        Ok(group)
    }

    async fn create_project(
        &self,
        account_id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Project, AuthzError> {
        let mut tables = self.lock();
        let project = Project::new(account_id, name.to_string(), now);
        tables.projects.insert(project.project_id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, AuthzError> {
        Ok(self.lock().projects.get(&project_id).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AuthzError> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthzError> {
        Ok(self.lock().find_user_by_email(email))
    }

    async fn insert_user(&self, user: &User) -> Result<(), AuthzError> {
        self.lock().users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn create_tenant(
        &self,
        account_name: &str,
        project_name: &str,
        admin: Option<NewAdminUser>,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedTenant, AuthzError> {
        let mut tables = self.lock();
        Ok(tables.provision_tenant(account_name, project_name, admin, now))
    }

    async fn grant_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
        now: DateTime<Utc>,
    ) -> Result<(), AuthzError> {
        self.lock().grant(user_id, group_id, role, now);
        Ok(())
    }

    async fn revoke_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
    ) -> Result<(), AuthzError> {
        let mut tables = self.lock();
        if let Some(membership_id) = tables.membership(user_id, group_id).map(|m| m.membership_id)
        {
            tables
                .grants
                .remove(&(membership_id, role.as_str().to_string()));
        }
        Ok(())
    }

    async fn role_names_in_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<String>, AuthzError> {
        let tables = self.lock();
        let Some(membership_id) = tables.membership(user_id, group_id).map(|m| m.membership_id)
        else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = tables
            .grants
            .iter()
            .filter(|(m, _)| *m == membership_id)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn holds_role_anywhere(&self, user_id: Uuid, role: RoleName) -> Result<bool, AuthzError> {
        let tables = self.lock();
        let memberships: HashSet<Uuid> = tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.membership_id)
            .collect();
        Ok(tables
            .grants
            .iter()
            .any(|(m, name)| memberships.contains(m) && name == role.as_str()))
    }

    async fn users_with_roles_in_group(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<(User, String)>, AuthzError> {
        let tables = self.lock();
        let mut rows = Vec::new();
        for membership in tables.memberships.iter().filter(|m| m.group_id == group_id) {
            let Some(user) = tables.users.get(&membership.user_id) else {
                continue;
            };
            for (m, name) in tables.grants.iter() {
                if *m == membership.membership_id {
                    rows.push((user.clone(), name.clone()));
                }
            }
        }
        rows.sort_by(|(a, _), (b, _)| a.email.cmp(&b.email));
        Ok(rows)
    }

    async fn insert_invite(&self, invite: &Invite) -> Result<(), AuthzError> {
        self.lock().invites.insert(invite.invite_id, invite.clone());
        Ok(())
    }

    async fn find_invite_by_token(&self, token: &str) -> Result<Option<Invite>, AuthzError> {
        let tables = self.lock();
        Ok(tables.invites.values().find(|i| i.token == token).cloned())
    }

    async fn accept_invite(
        &self,
        invite_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthzError> {
        let mut tables = self.lock();

        let invite = tables
            .invites
            .get(&invite_id)
            .cloned()
            .ok_or(AuthzError::NotFound)?;

        // First writer wins on used_utc; expiry is re-checked under the
        // table lock so a concurrent revoke is not lost.
        if invite.used_utc.is_some() {
            return Err(AuthzError::AlreadyUsed);
        }
        if now >= invite.expiry_utc {
            return Err(AuthzError::Expired);
        }

        let role = RoleName::parse_known(&invite.role_name).ok_or_else(|| {
            AuthzError::validation(format!("invite carries unknown role '{}'", invite.role_name))
        })?;

        let group_id = tables
            .accounts
            .get(&invite.account_id)
            .map(|a| a.group_id)
            .ok_or(AuthzError::NotFound)?;

        let user = match tables.find_user_by_email(&invite.email) {
            Some(mut user) => {
                user.password_hash = Some(password_hash.to_string());
                user.first_login_required = false;
                tables.users.insert(user.user_id, user.clone());
                user
            }
            None => {
                let user = User::new(
                    invite.email.clone(),
                    None,
                    Some(password_hash.to_string()),
                    Some(invite.account_id),
                    now,
                );
                tables.users.insert(user.user_id, user.clone());
                user
            }
        };

        tables.grant(user.user_id, group_id, role, now);

        if let Some(stored) = tables.invites.get_mut(&invite_id) {
            stored.used_utc = Some(now);
        }

        Ok(user)
    }

    async fn force_invite_expiry(
        &self,
        invite_id: Uuid,
        expiry_utc: DateTime<Utc>,
    ) -> Result<(), AuthzError> {
        let mut tables = self.lock();
        if let Some(invite) = tables.invites.get_mut(&invite_id) {
            invite.expiry_utc = expiry_utc;
        }
        Ok(())
    }

    async fn invites_for_project(&self, project_id: Uuid) -> Result<Vec<Invite>, AuthzError> {
        let tables = self.lock();
        let mut invites: Vec<Invite> = tables
            .invites
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(invites)
    }

    async fn insert_first_login_token(&self, token: &FirstLoginToken) -> Result<(), AuthzError> {
        self.lock()
            .first_login_tokens
            .insert(token.token_id, token.clone());
        Ok(())
    }

    async fn find_first_login_token(
        &self,
        token: &str,
    ) -> Result<Option<FirstLoginToken>, AuthzError> {
        let tables = self.lock();
        Ok(tables
            .first_login_tokens
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn consume_first_login_token(
        &self,
        token_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AuthzError> {
        let mut tables = self.lock();
        let Some(token) = tables.first_login_tokens.remove(&token_id) else {
            return Ok(false);
        };
        if let Some(user) = tables.users.get_mut(&token.user_id) {
            user.password_hash = Some(password_hash.to_string());
            user.first_login_required = false;
        }
        Ok(true)
    }
}
