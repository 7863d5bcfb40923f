//! Account model - a tenant, backed 1:1 by a group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account entity. The tenant name lives on the backing group.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub group_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Account {
    pub fn new(group_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            group_id,
            created_utc: now,
        }
    }
}
