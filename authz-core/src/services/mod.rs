pub mod bootstrap;
pub mod clock;
pub mod error;
pub mod first_login;
pub mod invites;
pub mod membership;
pub mod notify;
pub mod onboarding;
pub mod rbac;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::AuthzError;
pub use first_login::FirstLoginTokens;
pub use invites::{CreateInvite, InviteManager};
pub use membership::MembershipResolver;
pub use notify::{EmailNotifier, LoggingNotifier, MockNotifier, Notification, Notifier};
pub use onboarding::{OnboardingService, TenantWithAdmin, TenantWithInvite};
pub use rbac::RbacEngine;
