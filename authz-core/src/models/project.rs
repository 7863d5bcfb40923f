//! Project model - a named workspace inside an account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Project entity. Invitations are scoped to a project; the role they grant
/// applies in the owning account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub project_id: Uuid,
    pub account_id: Uuid,
    pub project_name: String,
    pub created_utc: DateTime<Utc>,
}

impl Project {
    pub fn new(account_id: Uuid, project_name: String, now: DateTime<Utc>) -> Self {
        Self {
            project_id: Uuid::new_v4(),
            account_id,
            project_name,
            created_utc: now,
        }
    }
}
