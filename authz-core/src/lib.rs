//! Multi-tenant authorization core: role-based access control, group
//! memberships, invite and first-login token lifecycles, and tenant
//! onboarding, backed by a pluggable relational store.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use config::AuthzConfig;
use services::clock::Clock;
use services::first_login::FirstLoginTokens;
use services::invites::InviteManager;
use services::membership::MembershipResolver;
use services::notify::Notifier;
use services::onboarding::OnboardingService;
use services::rbac::RbacEngine;
use store::Store;

/// Wires the store, clock and notifier into the full service set.
#[derive(Clone)]
pub struct AuthzCore {
    pub rbac: RbacEngine,
    pub memberships: MembershipResolver,
    pub invites: InviteManager,
    pub first_login: FirstLoginTokens,
    pub onboarding: OnboardingService,
}

impl AuthzCore {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: AuthzConfig,
    ) -> Self {
        let memberships = MembershipResolver::new(store.clone(), clock.clone());
        let rbac = RbacEngine::new(store.clone(), memberships.clone());
        let invites = InviteManager::new(store.clone(), clock.clone(), config.invites.clone());
        let first_login =
            FirstLoginTokens::new(store.clone(), clock.clone(), config.first_login.clone());
        let onboarding = OnboardingService::new(
            store,
            invites.clone(),
            first_login.clone(),
            notifier,
            clock,
            config,
        );

        Self {
            rbac,
            memberships,
            invites,
            first_login,
            onboarding,
        }
    }
}
