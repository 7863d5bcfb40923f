//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User entity.
///
/// `account_id` is the user's primary account membership and drives
/// accessible-account listing for non-super-admins. `password_hash` is `None`
/// until the user has established credentials (directly provisioned admins
/// set theirs through a first-login token).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub account_id: Option<Uuid>,
    pub first_login_required: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a user who already holds credentials (invite acceptance path).
    pub fn new(
        email: String,
        display_name: Option<String>,
        password_hash: Option<String>,
        account_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            account_id,
            first_login_required: false,
            created_utc: now,
        }
    }

    /// Create a provisioned admin who must set a password on first login.
    pub fn new_pending_first_login(
        email: String,
        display_name: Option<String>,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            display_name,
            password_hash: None,
            account_id: Some(account_id),
            first_login_required: true,
            created_utc: now,
        }
    }
}

/// Parameters for the admin user created inside the tenant-provisioning
/// transaction.
#[derive(Debug, Clone)]
pub struct NewAdminUser {
    pub email: String,
    pub display_name: Option<String>,
}
