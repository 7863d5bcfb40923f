//! First-login token model - single-use password-establishment tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// First-login token entity, scoped to one user.
///
/// Consuming the token sets the user's password and clears
/// `first_login_required`; the row is deleted on consumption, so a consumed
/// token simply does not resolve any more.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FirstLoginToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl FirstLoginToken {
    pub fn new(user_id: Uuid, token: String, expiry_utc: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            token_id: Uuid::new_v4(),
            user_id,
            token,
            expiry_utc,
            created_utc: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_utc
    }
}
