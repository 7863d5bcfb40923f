//! PostgreSQL store implementation.
//!
//! Plain sqlx queries over a connection pool; composite mutations run inside
//! a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    Account, FirstLoginToken, Group, Invite, NewAdminUser, Project, RoleName, User,
};
use crate::services::error::AuthzError;

use super::{ProvisionedTenant, Store};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensure membership and the role-grant row inside an open transaction.
    async fn grant_role_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
        now: DateTime<Utc>,
    ) -> Result<(), AuthzError> {
        sqlx::query(
            r#"
            INSERT INTO user_group_memberships (membership_id, user_id, group_id, created_utc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, group_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(group_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_group_roles (membership_id, role_id)
            SELECT m.membership_id, r.role_id
            FROM user_group_memberships m, roles r
            WHERE m.user_id = $1 AND m.group_id = $2 AND r.role_name = $3
            ON CONFLICT (membership_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(role.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), AuthzError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Store health check failed: {}", e);
            AuthzError::Database(e)
        })?;
        Ok(())
    }

    async fn ensure_root_group(&self, now: DateTime<Utc>) -> Result<(Group, bool), AuthzError> {
        let result = sqlx::query(
            r#"
            INSERT INTO groups (group_id, parent_group_id, group_name, created_utc)
            VALUES ($1, NULL, 'root', $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;

        let group = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE parent_group_id IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((group, created))
    }

    async fn create_account(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(Account, Group), AuthzError> {
        let mut tx = self.pool.begin().await?;

        let root: Group =
            sqlx::query_as("SELECT * FROM groups WHERE parent_group_id IS NULL")
                .fetch_one(&mut *tx)
                .await?;

        let group = Group::new(name.to_string(), Some(root.group_id), now);
        sqlx::query(
            r#"
            INSERT INTO groups (group_id, parent_group_id, group_name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(group.group_id)
        .bind(group.parent_group_id)
        .bind(&group.group_name)
        .bind(group.created_utc)
        .execute(&mut *tx)
        .await?;

        let account = Account::new(group.group_id, now);
        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, group_id, created_utc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(account.account_id)
        .bind(account.group_id)
        .bind(account.created_utc)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((account, group))
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, AuthzError> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(account)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AuthzError> {
        let accounts =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_utc")
                .fetch_all(&self.pool)
                .await?;
        Ok(accounts)
    }

    async fn group_for_account(&self, account_id: Uuid) -> Result<Option<Group>, AuthzError> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.* FROM groups g
            JOIN accounts a ON g.group_id = a.group_id
            WHERE a.account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn create_project(
        &self,
        account_id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Project, AuthzError> {
        let project = Project::new(account_id, name.to_string(), now);
        sqlx::query(
            r#"
            INSERT INTO projects (project_id, account_id, project_name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(project.project_id)
        .bind(project.account_id)
        .bind(&project.project_name)
        .bind(project.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(project)
    }

    async fn find_project(&self, project_id: Uuid) -> Result<Option<Project>, AuthzError> {
        let project =
            sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE project_id = $1")
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(project)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AuthzError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthzError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AuthzError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, display_name, password_hash, account_id, first_login_required, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.account_id)
        .bind(user.first_login_required)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_tenant(
        &self,
        account_name: &str,
        project_name: &str,
        admin: Option<NewAdminUser>,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedTenant, AuthzError> {
        let mut tx = self.pool.begin().await?;

        let root: Group =
            sqlx::query_as("SELECT * FROM groups WHERE parent_group_id IS NULL")
                .fetch_one(&mut *tx)
                .await?;

        let group = Group::new(account_name.to_string(), Some(root.group_id), now);
        sqlx::query(
            r#"
            INSERT INTO groups (group_id, parent_group_id, group_name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(group.group_id)
        .bind(group.parent_group_id)
        .bind(&group.group_name)
        .bind(group.created_utc)
        .execute(&mut *tx)
        .await?;

        let account = Account::new(group.group_id, now);
        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, group_id, created_utc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(account.account_id)
        .bind(account.group_id)
        .bind(account.created_utc)
        .execute(&mut *tx)
        .await?;

        let project = Project::new(account.account_id, project_name.to_string(), now);
        sqlx::query(
            r#"
            INSERT INTO projects (project_id, account_id, project_name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(project.project_id)
        .bind(project.account_id)
        .bind(&project.project_name)
        .bind(project.created_utc)
        .execute(&mut *tx)
        .await?;

        let admin_user = match admin {
            Some(new_admin) => {
                let user = User::new_pending_first_login(
                    new_admin.email,
                    new_admin.display_name,
                    account.account_id,
                    now,
                );
                sqlx::query(
                    r#"
                    INSERT INTO users (user_id, email, display_name, password_hash, account_id, first_login_required, created_utc)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(user.user_id)
                .bind(&user.email)
                .bind(&user.display_name)
                .bind(&user.password_hash)
                .bind(user.account_id)
                .bind(user.first_login_required)
                .bind(user.created_utc)
                .execute(&mut *tx)
                .await?;

                Self::grant_role_in_tx(&mut tx, user.user_id, group.group_id, RoleName::Admin, now)
                    .await?;

                Some(user)
            }
            None => None,
        };

        tx.commit().await?;

        Ok(ProvisionedTenant {
            account,
            group,
            project,
            admin: admin_user,
        })
    }

    async fn grant_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
        now: DateTime<Utc>,
    ) -> Result<(), AuthzError> {
        let mut tx = self.pool.begin().await?;
        Self::grant_role_in_tx(&mut tx, user_id, group_id, role, now).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn revoke_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: RoleName,
    ) -> Result<(), AuthzError> {
        sqlx::query(
            r#"
            DELETE FROM user_group_roles ugr
            USING user_group_memberships m, roles r
            WHERE ugr.membership_id = m.membership_id
              AND ugr.role_id = r.role_id
              AND m.user_id = $1 AND m.group_id = $2 AND r.role_name = $3
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn role_names_in_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<String>, AuthzError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.role_name FROM roles r
            JOIN user_group_roles ugr ON r.role_id = ugr.role_id
            JOIN user_group_memberships m ON ugr.membership_id = m.membership_id
            WHERE m.user_id = $1 AND m.group_id = $2
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn holds_role_anywhere(&self, user_id: Uuid, role: RoleName) -> Result<bool, AuthzError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_group_roles ugr
                JOIN user_group_memberships m ON ugr.membership_id = m.membership_id
                JOIN roles r ON ugr.role_id = r.role_id
                WHERE m.user_id = $1 AND r.role_name = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn users_with_roles_in_group(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<(User, String)>, AuthzError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: User,
            role_name: String,
        }

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT u.*, r.role_name FROM users u
            JOIN user_group_memberships m ON u.user_id = m.user_id
            JOIN user_group_roles ugr ON m.membership_id = ugr.membership_id
            JOIN roles r ON ugr.role_id = r.role_id
            WHERE m.group_id = $1
            ORDER BY u.email
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| (row.user, row.role_name)).collect())
    }

    async fn insert_invite(&self, invite: &Invite) -> Result<(), AuthzError> {
        sqlx::query(
            r#"
            INSERT INTO invites (invite_id, project_id, account_id, email, role_name, token, expiry_utc, used_utc, created_by_user_id, metadata, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invite.invite_id)
        .bind(invite.project_id)
        .bind(invite.account_id)
        .bind(&invite.email)
        .bind(&invite.role_name)
        .bind(&invite.token)
        .bind(invite.expiry_utc)
        .bind(invite.used_utc)
        .bind(invite.created_by_user_id)
        .bind(&invite.metadata)
        .bind(invite.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_invite_by_token(&self, token: &str) -> Result<Option<Invite>, AuthzError> {
        let invite = sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invite)
    }

    async fn accept_invite(
        &self,
        invite_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthzError> {
        let mut tx = self.pool.begin().await?;

        let invite: Invite =
            sqlx::query_as("SELECT * FROM invites WHERE invite_id = $1 FOR UPDATE")
                .bind(invite_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AuthzError::NotFound)?;

        // State is re-checked under the row lock: a revoke landing after the
        // caller's validation but before this transaction must win. Used
        // takes precedence over expired.
        if invite.used_utc.is_some() {
            return Err(AuthzError::AlreadyUsed);
        }
        if now >= invite.expiry_utc {
            return Err(AuthzError::Expired);
        }

        // First writer wins: the conditional update claims the invite.
        let claimed = sqlx::query(
            "UPDATE invites SET used_utc = $1 WHERE invite_id = $2 AND used_utc IS NULL",
        )
        .bind(now)
        .bind(invite_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Err(AuthzError::AlreadyUsed);
        }

        let role = RoleName::parse_known(&invite.role_name).ok_or_else(|| {
            AuthzError::validation(format!("invite carries unknown role '{}'", invite.role_name))
        })?;

        let existing: Option<User> =
            sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1) FOR UPDATE")
                .bind(&invite.email)
                .fetch_optional(&mut *tx)
                .await?;

        let user = match existing {
            Some(mut user) => {
                sqlx::query(
                    "UPDATE users SET password_hash = $1, first_login_required = false WHERE user_id = $2",
                )
                .bind(password_hash)
                .bind(user.user_id)
                .execute(&mut *tx)
                .await?;
                user.password_hash = Some(password_hash.to_string());
                user.first_login_required = false;
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
                sqlx::query(
                    r#"
                    INSERT INTO users (user_id, email, display_name, password_hash, account_id, first_login_required, created_utc)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(user.user_id)
                .bind(&user.email)
                .bind(&user.display_name)
                .bind(&user.password_hash)
                .bind(user.account_id)
                .bind(user.first_login_required)
                .bind(user.created_utc)
                .execute(&mut *tx)
                .await?;
                user
            }
        };

        let group: Group = sqlx::query_as(
            r#"
            SELECT g.* FROM groups g
            JOIN accounts a ON g.group_id = a.group_id
            WHERE a.account_id = $1
            "#,
        )
        .bind(invite.account_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::grant_role_in_tx(&mut tx, user.user_id, group.group_id, role, now).await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn force_invite_expiry(
        &self,
        invite_id: Uuid,
        expiry_utc: DateTime<Utc>,
    ) -> Result<(), AuthzError> {
        sqlx::query("UPDATE invites SET expiry_utc = $1 WHERE invite_id = $2")
            .bind(expiry_utc)
            .bind(invite_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn invites_for_project(&self, project_id: Uuid) -> Result<Vec<Invite>, AuthzError> {
        let invites = sqlx::query_as::<_, Invite>(
            "SELECT * FROM invites WHERE project_id = $1 ORDER BY created_utc DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    async fn insert_first_login_token(&self, token: &FirstLoginToken) -> Result<(), AuthzError> {
        sqlx::query(
            r#"
            INSERT INTO first_login_tokens (token_id, user_id, token, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expiry_utc)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_first_login_token(
        &self,
        token: &str,
    ) -> Result<Option<FirstLoginToken>, AuthzError> {
        let row =
            sqlx::query_as::<_, FirstLoginToken>("SELECT * FROM first_login_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn consume_first_login_token(
        &self,
        token_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AuthzError> {
        let mut tx = self.pool.begin().await?;

        let deleted: Option<(Uuid,)> = sqlx::query_as(
            "DELETE FROM first_login_tokens WHERE token_id = $1 RETURNING user_id",
        )
        .bind(token_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id,)) = deleted else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE users SET password_hash = $1, first_login_required = false WHERE user_id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
