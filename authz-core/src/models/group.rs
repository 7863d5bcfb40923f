//! Group model - the hierarchical scoping unit for role grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Group entity.
///
/// Every account is backed by exactly one group, which carries the tenant's
/// human-readable name. The single root group (no parent) hosts global role
/// grants such as super-admin.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub group_id: Uuid,
    pub parent_group_id: Option<Uuid>,
    pub group_name: String,
    pub created_utc: DateTime<Utc>,
}

impl Group {
    /// Create a new group under the given parent.
    pub fn new(group_name: String, parent_group_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            group_id: Uuid::new_v4(),
            parent_group_id,
            group_name,
            created_utc: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_group_id.is_none()
    }
}
