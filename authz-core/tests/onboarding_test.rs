//! Tenant onboarding: both flows, notification policy, bootstrap.

mod common;

use authz_core::models::RoleName;
use authz_core::services::{AuthzError, Clock, Notification};
use authz_core::store::Store;
use common::{TestEnv, TEST_PASSWORD};
use uuid::Uuid;

#[tokio::test]
async fn immediate_admin_flow_provisions_everything() {
    let env = TestEnv::spawn().await;

    let tenant = env
        .core
        .onboarding
        .create_tenant_with_admin("acme", "launch", "founder@acme.test", Some("Founder".to_string()))
        .await
        .unwrap();

    assert_eq!(tenant.group.group_name, "acme");
    assert!(!tenant.group.is_root());
    assert_eq!(tenant.account.group_id, tenant.group.group_id);
    assert_eq!(tenant.project.project_name, "launch");
    assert_eq!(tenant.project.account_id, tenant.account.account_id);

    let admin = &tenant.admin;
    assert_eq!(admin.email, "founder@acme.test");
    assert_eq!(admin.display_name.as_deref(), Some("Founder"));
    assert!(admin.first_login_required);
    assert!(admin.password_hash.is_none());
    assert_eq!(admin.account_id, Some(tenant.account.account_id));

    assert_eq!(
        env.core
            .rbac
            .get_user_role_in_account(admin.user_id, tenant.account.account_id)
            .await,
        Some(RoleName::Admin)
    );

    // The welcome notification carries the set-password link.
    assert!(tenant.notification_sent);
    let sent = env.notifier.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Notification::AdminWelcome {
            email,
            account_name,
            set_password_url,
        } => {
            assert_eq!(email, "founder@acme.test");
            assert_eq!(account_name, "acme");
            assert!(set_password_url.contains(&tenant.first_login_token.token));
        }
        other => panic!("unexpected notification: {other:?}"),
    }
}

#[tokio::test]
async fn admin_completes_first_login_after_provisioning() {
    let env = TestEnv::spawn().await;

    let tenant = env
        .core
        .onboarding
        .create_tenant_with_admin("acme", "launch", "founder@acme.test", None)
        .await
        .unwrap();

    let user = env
        .core
        .first_login
        .consume_first_login_token(&tenant.first_login_token.token, TEST_PASSWORD)
        .await
        .unwrap();

    assert_eq!(user.user_id, tenant.admin.user_id);
    assert!(!user.first_login_required);
    assert!(user.password_hash.is_some());
}

#[tokio::test]
async fn invite_flow_provisions_tenant_and_pending_invite() {
    let env = TestEnv::spawn().await;
    let operator = Uuid::new_v4();

    let tenant = env
        .core
        .onboarding
        .send_admin_invite("globex", "rollout", "ceo@globex.test", operator)
        .await
        .unwrap();

    assert_eq!(tenant.invite.email, "ceo@globex.test");
    assert_eq!(tenant.invite.role_name, "admin");
    assert_eq!(tenant.invite.project_id, tenant.project.project_id);
    assert_eq!(tenant.invite.created_by_user_id, operator);

    // No user exists yet; acceptance creates the admin.
    assert!(env
        .store
        .find_user_by_email("ceo@globex.test")
        .await
        .unwrap()
        .is_none());

    let (user, _) = env
        .core
        .invites
        .accept_invite(&tenant.invite.token, TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(
        env.core
            .rbac
            .get_user_role_in_account(user.user_id, tenant.account.account_id)
            .await,
        Some(RoleName::Admin)
    );

    assert!(tenant.notification_sent);
    let sent = env.notifier.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Notification::ProjectInvite {
            email,
            project_name,
            invite_url,
        } => {
            assert_eq!(email, "ceo@globex.test");
            assert_eq!(project_name, "rollout");
            assert!(invite_url.contains(&tenant.invite.token));
        }
        other => panic!("unexpected notification: {other:?}"),
    }
}

#[tokio::test]
async fn notification_failure_does_not_undo_provisioning() {
    let env = TestEnv::spawn().await;
    env.notifier.fail_next_sends(true);

    let tenant = env
        .core
        .onboarding
        .create_tenant_with_admin("acme", "launch", "founder@acme.test", None)
        .await
        .unwrap();

    assert!(!tenant.notification_sent);
    assert!(env.notifier.sent().is_empty());

    // Tenant, admin and token all exist; the flow can still complete.
    assert!(env.store.find_account(tenant.account.account_id).await.unwrap().is_some());
    env.core
        .first_login
        .consume_first_login_token(&tenant.first_login_token.token, TEST_PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_admin_email_aborts_before_provisioning() {
    let env = TestEnv::spawn().await;

    let err = env
        .core
        .onboarding
        .create_tenant_with_admin("acme", "launch", "not-an-email", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Validation(_)));

    assert!(env.store.list_accounts().await.unwrap().is_empty());
    assert!(env.notifier.sent().is_empty());
}

#[tokio::test]
async fn tenants_are_isolated_from_each_other() {
    let env = TestEnv::spawn().await;

    let acme = env
        .core
        .onboarding
        .create_tenant_with_admin("acme", "launch", "founder@acme.test", None)
        .await
        .unwrap();
    let globex = env
        .core
        .onboarding
        .create_tenant_with_admin("globex", "rollout", "ceo@globex.test", None)
        .await
        .unwrap();

    assert!(
        !env.core
            .rbac
            .can_access_account(acme.admin.user_id, globex.account.account_id)
            .await
    );
    assert!(
        env.core
            .rbac
            .get_user_role_in_account(acme.admin.user_id, globex.account.account_id)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn root_group_bootstrap_is_idempotent() {
    let env = TestEnv::spawn().await;
    env.store.health_check().await.unwrap();

    let (root, created) = env.store.ensure_root_group(env.clock.now()).await.unwrap();
    assert!(!created); // spawned fixtures bootstrap already
    assert!(root.is_root());

    let (again, created) = env.store.ensure_root_group(env.clock.now()).await.unwrap();
    assert!(!created);
    assert_eq!(again.group_id, root.group_id);
}
