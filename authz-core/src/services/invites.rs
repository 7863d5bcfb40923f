//! Invite manager - the single-use, expiring invitation lifecycle.
//!
//! State machine per invite: pending -> accepted | revoked | expired.
//! Revocation forces expiry into the past, so revoked and naturally expired
//! invites are indistinguishable afterwards. Validation checks used before
//! expired: an accepted invite reports already-used even once its expiry
//! has elapsed.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::InviteConfig;
use crate::models::{Invite, RoleName, User};
use crate::services::clock::Clock;
use crate::services::error::AuthzError;
use crate::store::Store;
use crate::utils::{self, validation};

/// Parameters for creating an invite.
#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub email: String,
    pub project_id: Uuid,
    /// Role granted on acceptance; defaults to admin.
    pub role: Option<RoleName>,
    pub created_by_user_id: Uuid,
    /// Override for the configured TTL.
    pub expires_in_hours: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

/// Creates, validates, accepts and revokes invitations.
#[derive(Clone)]
pub struct InviteManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: InviteConfig,
}

impl InviteManager {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: InviteConfig) -> Self {
        Self { store, clock, config }
    }

    /// Create a pending invite with a fresh random token.
    ///
    /// Fails with a validation error on a malformed email or a role outside
    /// the assignable set; the token shape check guards against a caller
    /// bypassing generation.
    #[tracing::instrument(skip(self, params), fields(project_id = %params.project_id))]
    pub async fn create_invite(&self, params: CreateInvite) -> Result<Invite, AuthzError> {
        validation::validate_email(&params.email)?;

        let role = params.role.unwrap_or(RoleName::Admin);
        if !role.is_assignable() {
            return Err(AuthzError::validation(format!(
                "role '{role}' cannot be granted through an invite"
            )));
        }

        let project = self
            .store
            .find_project(params.project_id)
            .await?
            .ok_or(AuthzError::NotFound)?;

        let token = utils::generate_token(self.config.token_bytes);
        validation::validate_token_shape(&token)?;

        let now = self.clock.now();
        let ttl_hours = params.expires_in_hours.unwrap_or(self.config.ttl_hours);
        let invite = Invite::new(
            project.project_id,
            project.account_id,
            params.email,
            role.as_str().to_string(),
            token,
            now + Duration::hours(ttl_hours),
            params.created_by_user_id,
            params.metadata.unwrap_or_else(|| serde_json::json!({})),
            now,
        );

        self.store.insert_invite(&invite).await?;

        tracing::info!(
            invite_id = %invite.invite_id,
            email = %invite.email,
            role = %role,
            "Invite created"
        );
        Ok(invite)
    }

    /// Look up an invite by token and check it is still usable. No side
    /// effects. Used-before-expired ordering.
    pub async fn validate_invite_token(&self, token: &str) -> Result<Invite, AuthzError> {
        let invite = self
            .store
            .find_invite_by_token(token)
            .await?
            .ok_or(AuthzError::NotFound)?;

        if invite.used_utc.is_some() {
            return Err(AuthzError::AlreadyUsed);
        }
        if self.clock.now() >= invite.expiry_utc {
            return Err(AuthzError::Expired);
        }
        Ok(invite)
    }

    /// Accept an invite: establish the user's credentials and grant the
    /// invite's role, atomically.
    ///
    /// Re-validates internally, so a caller holding a stale validation
    /// result cannot accept an invite that has since been used or expired.
    /// Under two concurrent acceptances the store's first-writer-wins claim
    /// on `used_utc` guarantees exactly one success.
    #[tracing::instrument(skip(self, token, password))]
    pub async fn accept_invite(
        &self,
        token: &str,
        password: &str,
    ) -> Result<(User, Invite), AuthzError> {
        let invite = self.validate_invite_token(token).await?;

        validation::validate_password_policy(password)?;
        let password_hash = utils::hash_password(&utils::Password::new(password.to_string()))?;

        let now = self.clock.now();
        let user = self
            .store
            .accept_invite(invite.invite_id, password_hash.as_str(), now)
            .await?;

        tracing::info!(
            invite_id = %invite.invite_id,
            user_id = %user.user_id,
            "Invite accepted"
        );

        let mut invite = invite;
        invite.used_utc = Some(now);
        Ok((user, invite))
    }

    /// Revoke an invite by forcing its expiry into the past. Idempotent in
    /// effect; returns the invite as it now stands, or not-found if the
    /// token never existed.
    #[tracing::instrument(skip(self, token))]
    pub async fn revoke_invite(&self, token: &str) -> Result<Invite, AuthzError> {
        let mut invite = self
            .store
            .find_invite_by_token(token)
            .await?
            .ok_or(AuthzError::NotFound)?;

        let revoked_expiry = self.clock.now() - Duration::seconds(1);
        if invite.expiry_utc > revoked_expiry {
            self.store
                .force_invite_expiry(invite.invite_id, revoked_expiry)
                .await?;
            invite.expiry_utc = revoked_expiry;
        }

        tracing::info!(invite_id = %invite.invite_id, "Invite revoked");
        Ok(invite)
    }

    /// All invites for the project, newest first.
    pub async fn list_project_invites(&self, project_id: Uuid) -> Result<Vec<Invite>, AuthzError> {
        self.store.invites_for_project(project_id).await
    }

    /// Invites for the project that are still pending, newest first.
    pub async fn list_pending_invites(&self, project_id: Uuid) -> Result<Vec<Invite>, AuthzError> {
        let now = self.clock.now();
        let invites = self.store.invites_for_project(project_id).await?;
        Ok(invites.into_iter().filter(|i| i.is_pending(now)).collect())
    }
}
