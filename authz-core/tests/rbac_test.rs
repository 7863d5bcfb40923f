//! Permission resolution and account accessibility.

mod common;

use authz_core::models::{Permission, PermissionSet, RoleName};
use authz_core::services::Clock;
use authz_core::store::Store;
use common::TestEnv;
use uuid::Uuid;

#[tokio::test]
async fn role_permission_table_is_fixed() {
    let env = TestEnv::spawn().await;

    let super_admin = env.core.rbac.get_role_permissions(RoleName::SuperAdmin);
    assert!(super_admin.can_manage_users);
    assert!(super_admin.can_edit_projects);
    assert!(super_admin.can_view_reports);
    assert!(super_admin.can_manage_billing);

    let admin = env.core.rbac.get_role_permissions(RoleName::Admin);
    assert!(!admin.can_manage_users);
    assert!(admin.can_edit_projects);
    assert!(admin.can_view_reports);
    assert!(admin.can_manage_billing);

    let editor = env.core.rbac.get_role_permissions(RoleName::Editor);
    assert!(!editor.can_manage_users);
    assert!(editor.can_edit_projects);
    assert!(editor.can_view_reports);
    assert!(!editor.can_manage_billing);

    let viewer = env.core.rbac.get_role_permissions(RoleName::Viewer);
    assert_eq!(
        viewer,
        PermissionSet {
            can_manage_users: false,
            can_edit_projects: false,
            can_view_reports: true,
            can_manage_billing: false,
        }
    );
}

#[tokio::test]
async fn granted_role_drives_user_permissions() {
    let env = TestEnv::spawn().await;
    let tenant = env.seed_tenant("acme").await;
    let user = env.seed_user("editor@acme.test", Some(tenant.account.account_id)).await;

    env.core
        .memberships
        .grant_role(user.user_id, tenant.account.account_id, RoleName::Editor)
        .await
        .unwrap();

    let perms = env
        .core
        .rbac
        .get_user_permissions(user.user_id, tenant.account.account_id)
        .await;
    assert!(perms.can_edit_projects);
    assert!(!perms.can_manage_billing);

    assert!(
        env.core
            .rbac
            .user_has_permission(
                user.user_id,
                tenant.account.account_id,
                Permission::CanViewReports
            )
            .await
    );
    assert!(
        !env.core
            .rbac
            .user_has_permission(
                user.user_id,
                tenant.account.account_id,
                Permission::CanManageUsers
            )
            .await
    );
}

#[tokio::test]
async fn user_without_role_has_no_permissions() {
    let env = TestEnv::spawn().await;
    let tenant = env.seed_tenant("acme").await;
    let user = env.seed_user("nobody@acme.test", Some(tenant.account.account_id)).await;

    let perms = env
        .core
        .rbac
        .get_user_permissions(user.user_id, tenant.account.account_id)
        .await;
    assert_eq!(perms, PermissionSet::NONE);
    assert!(
        env.core
            .rbac
            .get_user_role_in_account(user.user_id, tenant.account.account_id)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn unknown_account_denies_everything() {
    let env = TestEnv::spawn().await;
    let user = env.seed_user("someone@acme.test", None).await;
    let ghost_account = Uuid::new_v4();

    assert_eq!(
        env.core
            .rbac
            .get_user_permissions(user.user_id, ghost_account)
            .await,
        PermissionSet::NONE
    );
    assert!(!env.core.rbac.can_access_account(user.user_id, ghost_account).await);
}

#[tokio::test]
async fn strongest_role_wins_when_several_are_granted() {
    let env = TestEnv::spawn().await;
    let tenant = env.seed_tenant("acme").await;
    let user = env.seed_user("both@acme.test", Some(tenant.account.account_id)).await;

    env.core
        .memberships
        .grant_role(user.user_id, tenant.account.account_id, RoleName::Viewer)
        .await
        .unwrap();
    env.core
        .memberships
        .grant_role(user.user_id, tenant.account.account_id, RoleName::Admin)
        .await
        .unwrap();

    assert_eq!(
        env.core
            .rbac
            .get_user_role_in_account(user.user_id, tenant.account.account_id)
            .await,
        Some(RoleName::Admin)
    );
}

#[tokio::test]
async fn revoking_a_role_removes_its_permissions() {
    let env = TestEnv::spawn().await;
    let tenant = env.seed_tenant("acme").await;
    let user = env.seed_user("temp@acme.test", Some(tenant.account.account_id)).await;

    env.core
        .memberships
        .grant_role(user.user_id, tenant.account.account_id, RoleName::Editor)
        .await
        .unwrap();
    env.core
        .memberships
        .revoke_role(user.user_id, tenant.account.account_id, RoleName::Editor)
        .await
        .unwrap();

    assert_eq!(
        env.core
            .rbac
            .get_user_permissions(user.user_id, tenant.account.account_id)
            .await,
        PermissionSet::NONE
    );

    // Revoking again, or against a missing account, is a quiet no-op.
    env.core
        .memberships
        .revoke_role(user.user_id, tenant.account.account_id, RoleName::Editor)
        .await
        .unwrap();
    env.core
        .memberships
        .revoke_role(user.user_id, Uuid::new_v4(), RoleName::Editor)
        .await
        .unwrap();
}

#[tokio::test]
async fn super_admin_reaches_every_account() {
    let env = TestEnv::spawn().await;
    let acme = env.seed_tenant("acme").await;
    let globex = env.seed_tenant("globex").await;

    let root = env.store.ensure_root_group(env.clock.now()).await.unwrap().0;
    let operator = env.seed_user("operator@platform.test", None).await;
    env.store
        .grant_role(operator.user_id, root.group_id, RoleName::SuperAdmin, env.clock.now())
        .await
        .unwrap();

    assert!(env.core.rbac.is_super_admin(operator.user_id).await);
    assert!(
        env.core
            .rbac
            .can_access_account(operator.user_id, acme.account.account_id)
            .await
    );
    assert!(
        env.core
            .rbac
            .can_access_account(operator.user_id, globex.account.account_id)
            .await
    );

    let accessible = env
        .core
        .rbac
        .list_accessible_accounts(operator.user_id)
        .await
        .unwrap();
    assert_eq!(accessible.len(), 2);
}

#[tokio::test]
async fn regular_user_reaches_only_their_own_account() {
    let env = TestEnv::spawn().await;
    let acme = env.seed_tenant("acme").await;
    let globex = env.seed_tenant("globex").await;
    let user = env.seed_user("user@acme.test", Some(acme.account.account_id)).await;

    assert!(!env.core.rbac.is_super_admin(user.user_id).await);
    assert!(
        env.core
            .rbac
            .can_access_account(user.user_id, acme.account.account_id)
            .await
    );
    assert!(
        !env.core
            .rbac
            .can_access_account(user.user_id, globex.account.account_id)
            .await
    );

    let accessible = env.core.rbac.list_accessible_accounts(user.user_id).await.unwrap();
    assert_eq!(accessible.len(), 1);
    assert_eq!(accessible[0].account_id, acme.account.account_id);
}

#[tokio::test]
async fn account_roster_lists_users_with_known_roles() {
    let env = TestEnv::spawn().await;
    let tenant = env.seed_tenant("acme").await;
    let alice = env.seed_user("alice@acme.test", Some(tenant.account.account_id)).await;
    let bob = env.seed_user("bob@acme.test", Some(tenant.account.account_id)).await;

    env.core
        .memberships
        .grant_role(alice.user_id, tenant.account.account_id, RoleName::Admin)
        .await
        .unwrap();
    env.core
        .memberships
        .grant_role(bob.user_id, tenant.account.account_id, RoleName::Viewer)
        .await
        .unwrap();

    let roster = env
        .core
        .rbac
        .list_account_users_with_roles(tenant.account.account_id)
        .await
        .unwrap();

    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].0.email, "alice@acme.test");
    assert_eq!(roster[0].1, RoleName::Admin);
    assert_eq!(roster[1].0.email, "bob@acme.test");
    assert_eq!(roster[1].1, RoleName::Viewer);
}

#[tokio::test]
async fn account_without_projects_still_resolves_roles() {
    let env = TestEnv::spawn().await;
    let (account, group) = env
        .store
        .create_account("initech", env.clock.now())
        .await
        .unwrap();
    assert_eq!(account.group_id, group.group_id);
    assert!(!group.is_root());

    let user = env.seed_user("user@initech.test", Some(account.account_id)).await;
    env.core
        .memberships
        .grant_role(user.user_id, account.account_id, RoleName::Viewer)
        .await
        .unwrap();

    assert_eq!(
        env.core
            .rbac
            .get_user_role_in_account(user.user_id, account.account_id)
            .await,
        Some(RoleName::Viewer)
    );
}

#[tokio::test]
async fn roster_of_missing_account_is_empty() {
    let env = TestEnv::spawn().await;
    let roster = env
        .core
        .rbac
        .list_account_users_with_roles(Uuid::new_v4())
        .await
        .unwrap();
    assert!(roster.is_empty());
}
