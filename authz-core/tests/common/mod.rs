//! Shared fixtures for the integration tests.
//!
//! Everything runs against the in-memory store with a pinned clock and a
//! recording notifier, so the suite needs no external services.

#![allow(dead_code)]

use std::sync::Arc;

use authz_core::config::AuthzConfig;
use authz_core::models::{NewAdminUser, User};
use authz_core::services::{bootstrap, Clock, FixedClock, MockNotifier, Notifier};
use authz_core::store::{MemoryStore, ProvisionedTenant, Store};
use authz_core::AuthzCore;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Fully wired core over in-memory infrastructure.
pub struct TestEnv {
    pub core: AuthzCore,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<MockNotifier>,
}

impl TestEnv {
    /// Build the environment with the root group already provisioned.
    pub async fn spawn() -> Self {
        init_tracing();

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(test_epoch()));
        let notifier = Arc::new(MockNotifier::new());

        let store_dyn = store.clone() as Arc<dyn Store>;
        let clock_dyn = clock.clone() as Arc<dyn Clock>;
        bootstrap::ensure_root_group(&store_dyn, &clock_dyn)
            .await
            .expect("Failed to provision root group");

        let core = AuthzCore::new(
            store_dyn,
            notifier.clone() as Arc<dyn Notifier>,
            clock_dyn,
            AuthzConfig::default(),
        );

        TestEnv {
            core,
            store,
            clock,
            notifier,
        }
    }

    /// Provision a tenant without an admin user.
    pub async fn seed_tenant(&self, name: &str) -> ProvisionedTenant {
        self.store
            .create_tenant(name, &format!("{name} project"), None, self.clock.now())
            .await
            .expect("Failed to provision tenant")
    }

    /// Provision a tenant with a pending admin user.
    pub async fn seed_tenant_with_admin(&self, name: &str, admin_email: &str) -> ProvisionedTenant {
        self.store
            .create_tenant(
                name,
                &format!("{name} project"),
                Some(NewAdminUser {
                    email: admin_email.to_string(),
                    display_name: None,
                }),
                self.clock.now(),
            )
            .await
            .expect("Failed to provision tenant")
    }

    /// Insert a plain user whose primary account is `account_id`.
    pub async fn seed_user(&self, email: &str, account_id: Option<Uuid>) -> User {
        let user = User::new(
            email.to_string(),
            None,
            Some("$argon2-placeholder".to_string()),
            account_id,
            self.clock.now(),
        );
        self.store
            .insert_user(&user)
            .await
            .expect("Failed to insert user");
        user
    }
}

/// Arbitrary fixed instant all tests start from.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Log capture per test binary, honoring RUST_LOG.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
