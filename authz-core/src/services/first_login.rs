//! First-login tokens - single-use password establishment for provisioned
//! admins.
//!
//! The row is deleted on consumption, so a consumed token reads as
//! not-found afterwards; only an unconsumed token past its window reads as
//! expired.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::FirstLoginConfig;
use crate::models::{FirstLoginToken, User};
use crate::services::clock::Clock;
use crate::services::error::AuthzError;
use crate::store::Store;
use crate::utils::{self, validation};

/// Issues, validates and consumes first-login tokens.
#[derive(Clone)]
pub struct FirstLoginTokens {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: FirstLoginConfig,
}

impl FirstLoginTokens {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: FirstLoginConfig) -> Self {
        Self { store, clock, config }
    }

    /// Issue a fresh token for the user.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn issue_first_login_token(
        &self,
        user_id: Uuid,
    ) -> Result<FirstLoginToken, AuthzError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(AuthzError::NotFound)?;

        let now = self.clock.now();
        let token = FirstLoginToken::new(
            user.user_id,
            utils::generate_token(self.config.token_bytes),
            now + Duration::hours(self.config.ttl_hours),
            now,
        );

        self.store.insert_first_login_token(&token).await?;

        tracing::info!(token_id = %token.token_id, "First-login token issued");
        Ok(token)
    }

    /// Look up a token and check it is still within its validity window.
    /// No side effects.
    pub async fn validate_first_login_token(
        &self,
        token: &str,
    ) -> Result<FirstLoginToken, AuthzError> {
        let row = self
            .store
            .find_first_login_token(token)
            .await?
            .ok_or(AuthzError::NotFound)?;

        if row.is_expired(self.clock.now()) {
            return Err(AuthzError::Expired);
        }
        Ok(row)
    }

    /// Consume the token: set the user's password, clear
    /// `first_login_required`, delete the token - atomically. A concurrent
    /// consumer losing the delete race observes not-found.
    #[tracing::instrument(skip(self, token, password))]
    pub async fn consume_first_login_token(
        &self,
        token: &str,
        password: &str,
    ) -> Result<User, AuthzError> {
        let row = self.validate_first_login_token(token).await?;

        validation::validate_password_policy(password)?;
        let password_hash = utils::hash_password(&utils::Password::new(password.to_string()))?;

        let consumed = self
            .store
            .consume_first_login_token(row.token_id, password_hash.as_str())
            .await?;
        if !consumed {
            return Err(AuthzError::NotFound);
        }

        let user = self
            .store
            .find_user(row.user_id)
            .await?
            .ok_or(AuthzError::NotFound)?;

        tracing::info!(user_id = %user.user_id, "First-login token consumed");
        Ok(user)
    }
}
