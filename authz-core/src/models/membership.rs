//! Membership model - the user/group join entity role grants attach to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Group membership join entity, unique per (user, group).
///
/// Existence means "this user belongs to this group" and carries no
/// permission on its own; permissions come from role grants attached to it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl GroupMembership {
    pub fn new(user_id: Uuid, group_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            membership_id: Uuid::new_v4(),
            user_id,
            group_id,
            created_utc: now,
        }
    }
}
