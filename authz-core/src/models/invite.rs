//! Invite model - single-use, expiring invitations with a pre-assigned role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invite lifecycle states as observed at a point in time.
///
/// Revocation forces `expiry_utc` into the past, so a revoked invite reads
/// as `Expired`; the two are indistinguishable after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
}

/// Invite entity.
///
/// The token is a random URL-safe string and the sole lookup key for
/// validation, acceptance and revocation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invite {
    pub invite_id: Uuid,
    pub project_id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    pub role_name: String,
    pub token: String,
    pub expiry_utc: DateTime<Utc>,
    pub used_utc: Option<DateTime<Utc>>,
    pub created_by_user_id: Uuid,
    pub metadata: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

impl Invite {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_id: Uuid,
        account_id: Uuid,
        email: String,
        role_name: String,
        token: String,
        expiry_utc: DateTime<Utc>,
        created_by_user_id: Uuid,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            invite_id: Uuid::new_v4(),
            project_id,
            account_id,
            email,
            role_name,
            token,
            expiry_utc,
            used_utc: None,
            created_by_user_id,
            metadata,
            created_utc: now,
        }
    }

    /// Current status. The used check comes first: an accepted invite reports
    /// `Accepted` even if its expiry has since elapsed.
    pub fn status(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.used_utc.is_some() {
            InviteStatus::Accepted
        } else if now >= self.expiry_utc {
            InviteStatus::Expired
        } else {
            InviteStatus::Pending
        }
    }

    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == InviteStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invite_expiring_at(expiry_utc: DateTime<Utc>) -> Invite {
        let now = Utc::now();
        Invite::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "someone@example.com".to_string(),
            "admin".to_string(),
            "token".repeat(8),
            expiry_utc,
            Uuid::new_v4(),
            serde_json::json!({}),
            now,
        )
    }

    #[test]
    fn fresh_invite_is_pending() {
        let now = Utc::now();
        let invite = invite_expiring_at(now + Duration::hours(72));
        assert_eq!(invite.status(now), InviteStatus::Pending);
        assert!(invite.is_pending(now));
    }

    #[test]
    fn elapsed_expiry_reads_expired() {
        let now = Utc::now();
        let invite = invite_expiring_at(now - Duration::seconds(1));
        assert_eq!(invite.status(now), InviteStatus::Expired);
    }

    #[test]
    fn used_wins_over_expired() {
        let now = Utc::now();
        let mut invite = invite_expiring_at(now - Duration::hours(1));
        invite.used_utc = Some(now - Duration::hours(2));
        assert_eq!(invite.status(now), InviteStatus::Accepted);
    }
}
