//! Notification capability.
//!
//! Fire-and-forget from the core's perspective: dispatch failures are
//! surfaced to logs by callers and never roll back the operation that
//! triggered them.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::services::error::AuthzError;

/// A notification this core can dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// "Welcome, set your password" for a directly provisioned admin.
    AdminWelcome {
        email: String,
        account_name: String,
        set_password_url: String,
    },
    /// "You have been invited to join" for the invite flow.
    ProjectInvite {
        email: String,
        project_name: String,
        invite_url: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::AdminWelcome { email, .. } => email,
            Notification::ProjectInvite { email, .. } => email,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::AdminWelcome { account_name, .. } => {
                format!("Welcome to {account_name} - set your password")
            }
            Notification::ProjectInvite { project_name, .. } => {
                format!("You have been invited to join {project_name}")
            }
        }
    }

    fn plain_body(&self) -> String {
        match self {
            Notification::AdminWelcome {
                account_name,
                set_password_url,
                ..
            } => format!(
                "Your administrator account for {account_name} is ready.\n\n\
                 Set your password here: {set_password_url}\n\n\
                 The link is valid for a limited time and can be used once."
            ),
            Notification::ProjectInvite {
                project_name,
                invite_url,
                ..
            } => format!(
                "You have been invited to join {project_name}.\n\n\
                 Accept the invitation here: {invite_url}\n\n\
                 The link is valid for a limited time and can be used once."
            ),
        }
    }
}

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), AuthzError>;
}

/// SMTP-backed notifier.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AuthzError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AuthzError::Notification(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email notifier initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AuthzError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        AuthzError::Notification(e.to_string())
                    })?,
            )
            .to(notification.recipient().parse().map_err(
                |e: lettre::address::AddressError| AuthzError::Notification(e.to_string()),
            )?)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.plain_body())
            .map_err(|e| AuthzError::Notification(e.to_string()))?;

        // SMTP send is blocking; keep it off the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AuthzError::Notification(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %notification.recipient(), "Notification sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %notification.recipient(), error = %e, "Failed to send notification");
                Err(AuthzError::Notification(e.to_string()))
            }
        }
    }
}

/// Notifier that only logs, for deployments without an SMTP relay.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AuthzError> {
        tracing::info!(
            to = %notification.recipient(),
            subject = %notification.subject(),
            "Notification (log only)"
        );
        Ok(())
    }
}

/// Test double recording every send; can be flipped into a failing mode.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AuthzError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthzError::Notification("mock notifier failure".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push(notification.clone());
        Ok(())
    }
}
