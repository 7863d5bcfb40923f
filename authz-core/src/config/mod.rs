use serde::Deserialize;
use std::env;

use crate::services::error::AuthzError;

/// Full configuration for the authorization core. Loaded from the
/// environment in deployments; `Default` gives sensible values for tests.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub invites: InviteConfig,
    pub first_login: FirstLoginConfig,
    pub links: LinkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteConfig {
    pub ttl_hours: i64,
    pub token_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirstLoginConfig {
    pub ttl_hours: i64,
    pub token_bytes: usize,
}

/// Base URL used when building set-password and invite links.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub base_url: String,
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AuthzError> {
        let config = AuthzConfig {
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None)?,
                max_connections: get_env_parsed("DATABASE_MAX_CONNECTIONS", Some("10"))?,
                min_connections: get_env_parsed("DATABASE_MIN_CONNECTIONS", Some("1"))?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("localhost"))?,
                port: get_env_parsed("SMTP_PORT", Some("587"))?,
                user: get_env("SMTP_USER", Some(""))?,
                password: get_env("SMTP_PASSWORD", Some(""))?,
                from_email: get_env("SMTP_FROM_EMAIL", Some("no-reply@localhost"))?,
            },
            invites: InviteConfig {
                ttl_hours: get_env_parsed("INVITE_TTL_HOURS", Some("72"))?,
                token_bytes: get_env_parsed("INVITE_TOKEN_BYTES", Some("32"))?,
            },
            first_login: FirstLoginConfig {
                ttl_hours: get_env_parsed("FIRST_LOGIN_TTL_HOURS", Some("24"))?,
                token_bytes: get_env_parsed("FIRST_LOGIN_TOKEN_BYTES", Some("32"))?,
            },
            links: LinkConfig {
                base_url: get_env("LINK_BASE_URL", Some("http://localhost:3000"))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuthzError> {
        if self.invites.ttl_hours <= 0 {
            return Err(AuthzError::Validation(
                "INVITE_TTL_HOURS must be positive".to_string(),
            ));
        }
        if self.first_login.ttl_hours <= 0 {
            return Err(AuthzError::Validation(
                "FIRST_LOGIN_TTL_HOURS must be positive".to_string(),
            ));
        }
        // Token byte counts outside this range would produce tokens the
        // shape check rejects.
        if self.invites.token_bytes < 24 || self.invites.token_bytes > 48 {
            return Err(AuthzError::Validation(
                "INVITE_TOKEN_BYTES must be between 24 and 48".to_string(),
            ));
        }
        if self.first_login.token_bytes < 24 || self.first_login.token_bytes > 48 {
            return Err(AuthzError::Validation(
                "FIRST_LOGIN_TOKEN_BYTES must be between 24 and 48".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/authz".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            smtp: SmtpConfig {
                host: "localhost".to_string(),
                port: 587,
                user: String::new(),
                password: String::new(),
                from_email: "no-reply@localhost".to_string(),
            },
            invites: InviteConfig {
                ttl_hours: 72,
                token_bytes: 32,
            },
            first_login: FirstLoginConfig {
                ttl_hours: 24,
                token_bytes: 32,
            },
            links: LinkConfig {
                base_url: "http://localhost:3000".to_string(),
            },
        }
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AuthzError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AuthzError::Validation(format!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

/// A malformed value is an error, never a silent fallback to the default.
fn get_env_parsed<T>(key: &str, default: Option<&str>) -> Result<T, AuthzError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default)?
        .parse()
        .map_err(|e: T::Err| AuthzError::Validation(format!("{}: {}", key, e)))
}
