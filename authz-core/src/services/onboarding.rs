//! Tenant onboarding orchestrator.
//!
//! Two flows, both producing a new account + project and ensuring it has an
//! administrator. The notification goes out after the provisioning
//! transaction has committed; a dispatch failure is logged and reported on
//! the result, never rolled back.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthzConfig;
use crate::models::{Account, FirstLoginToken, Group, Invite, NewAdminUser, Project, User};
use crate::services::clock::Clock;
use crate::services::error::AuthzError;
use crate::services::first_login::FirstLoginTokens;
use crate::services::invites::{CreateInvite, InviteManager};
use crate::services::notify::{Notification, Notifier};
use crate::store::Store;
use crate::utils::validation;

/// Result of the immediate-admin flow.
#[derive(Debug, Clone)]
pub struct TenantWithAdmin {
    pub account: Account,
    pub group: Group,
    pub project: Project,
    pub admin: User,
    pub first_login_token: FirstLoginToken,
    /// Whether the welcome notification went out.
    pub notification_sent: bool,
}

/// Result of the invite flow.
#[derive(Debug, Clone)]
pub struct TenantWithInvite {
    pub account: Account,
    pub group: Group,
    pub project: Project,
    pub invite: Invite,
    pub notification_sent: bool,
}

/// Composes tenant creation, admin provisioning and notification dispatch.
#[derive(Clone)]
pub struct OnboardingService {
    store: Arc<dyn Store>,
    invites: InviteManager,
    first_login: FirstLoginTokens,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: AuthzConfig,
}

impl OnboardingService {
    pub fn new(
        store: Arc<dyn Store>,
        invites: InviteManager,
        first_login: FirstLoginTokens,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: AuthzConfig,
    ) -> Self {
        Self {
            store,
            invites,
            first_login,
            notifier,
            clock,
            config,
        }
    }

    /// Immediate-admin flow: account, project, admin user
    /// (`first_login_required = true`) and admin role grant in one
    /// transaction; then a first-login token and the welcome notification.
    #[tracing::instrument(skip(self), fields(account_name = %account_name, admin_email = %admin_email))]
    pub async fn create_tenant_with_admin(
        &self,
        account_name: &str,
        project_name: &str,
        admin_email: &str,
        admin_display_name: Option<String>,
    ) -> Result<TenantWithAdmin, AuthzError> {
        validation::validate_email(admin_email)?;

        let provisioned = self
            .store
            .create_tenant(
                account_name,
                project_name,
                Some(NewAdminUser {
                    email: admin_email.to_string(),
                    display_name: admin_display_name,
                }),
                self.clock.now(),
            )
            .await?;

        let admin = provisioned
            .admin
            .ok_or_else(|| anyhow::anyhow!("tenant provisioning returned no admin user"))?;

        let first_login_token = self
            .first_login
            .issue_first_login_token(admin.user_id)
            .await?;

        let notification = Notification::AdminWelcome {
            email: admin.email.clone(),
            account_name: account_name.to_string(),
            set_password_url: format!(
                "{}/first-login/{}",
                self.config.links.base_url, first_login_token.token
            ),
        };
        let notification_sent = self.dispatch(&notification).await;

        tracing::info!(
            account_id = %provisioned.account.account_id,
            admin_id = %admin.user_id,
            "Tenant created with admin"
        );

        Ok(TenantWithAdmin {
            account: provisioned.account,
            group: provisioned.group,
            project: provisioned.project,
            admin,
            first_login_token,
            notification_sent,
        })
    }

    /// Invite flow: account and project in one transaction, then an admin
    /// invite for the given email and the invitation notification.
    #[tracing::instrument(skip(self), fields(account_name = %account_name, email = %email))]
    pub async fn send_admin_invite(
        &self,
        account_name: &str,
        project_name: &str,
        email: &str,
        created_by_user_id: Uuid,
    ) -> Result<TenantWithInvite, AuthzError> {
        validation::validate_email(email)?;

        let provisioned = self
            .store
            .create_tenant(account_name, project_name, None, self.clock.now())
            .await?;

        let invite = self
            .invites
            .create_invite(CreateInvite {
                email: email.to_string(),
                project_id: provisioned.project.project_id,
                role: None,
                created_by_user_id,
                expires_in_hours: None,
                metadata: None,
            })
            .await?;

        let notification = Notification::ProjectInvite {
            email: email.to_string(),
            project_name: provisioned.project.project_name.clone(),
            invite_url: format!("{}/invites/{}", self.config.links.base_url, invite.token),
        };
        let notification_sent = self.dispatch(&notification).await;

        tracing::info!(
            account_id = %provisioned.account.account_id,
            invite_id = %invite.invite_id,
            "Tenant created with admin invite"
        );

        Ok(TenantWithInvite {
            account: provisioned.account,
            group: provisioned.group,
            project: provisioned.project,
            invite,
            notification_sent,
        })
    }

    /// Best-effort dispatch. Failures are logged, never propagated; tenant
    /// creation has already committed by the time this runs.
    async fn dispatch(&self, notification: &Notification) -> bool {
        match self.notifier.send(notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    to = %notification.recipient(),
                    error = %e,
                    "Notification dispatch failed; tenant setup is unaffected"
                );
                false
            }
        }
    }
}
