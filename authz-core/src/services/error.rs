use thiserror::Error;

/// Error taxonomy for the authorization core.
///
/// Permission-check paths never surface these to callers; they fail closed
/// to "no permission" and log. Invite, token and onboarding mutations
/// propagate them explicitly so a broken tenant setup is never silent.
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Token, account, project or user does not exist.
    #[error("Not found")]
    NotFound,

    /// Invite already accepted. Terminal; callers must not retry.
    #[error("Invite already used")]
    AlreadyUsed,

    /// Invite or first-login token past its validity window. Terminal.
    #[error("Token expired")]
    Expired,

    /// Malformed input to a creation operation. Correct and retry.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The relational store rejected a mutation.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Notification dispatch failed. Logged by callers, never rolls back
    /// the triggering operation.
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthzError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AuthzError::Validation(msg.into())
    }
}
