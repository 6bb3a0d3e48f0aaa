//! Process configuration loaded from the environment.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

/// Signing key used when `JWT_SECRET` is unset. Never use in production.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// True when `jwt_secret` fell back to [`DEV_JWT_SECRET`].
    pub jwt_secret_is_default: bool,
    /// Session lifetime in seconds (default: 86_400 = 24 hours).
    pub jwt_expiration_secs: i64,
    /// Reset token lifetime in seconds (default: 900 = 15 minutes).
    pub password_reset_ttl_secs: i64,
    pub mail_from: String,
    /// Link placed in invitation mails.
    pub login_url: String,
    /// Base of the link placed in reset mails; `?token=...` is appended.
    pub reset_url: String,
    /// Unset selects the in-memory directory.
    pub database_url: Option<String>,
    /// Optional pepper prepended to passwords before Argon2id.
    pub password_pepper: Option<String>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret_is_default", &self.jwt_secret_is_default)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("password_reset_ttl_secs", &self.password_reset_ttl_secs)
            .field("mail_from", &self.mail_from)
            .field("login_url", &self.login_url)
            .field("reset_url", &self.reset_url)
            .field("database", &self.database_url.is_some())
            .field("peppered", &self.password_pepper.is_some())
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_secret_is_default: true,
            jwt_expiration_secs: 86_400,
            password_reset_ttl_secs: vocalyx_auth::DEFAULT_RESET_TTL_SECS,
            mail_from: "no-reply@example.com".to_string(),
            login_url: "http://localhost:5173/login".to_string(),
            reset_url: "http://localhost:8081/reset-password".to_string(),
            database_url: None,
            password_pepper: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("BIND_ADDR") {
            config.bind_addr = raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(secret) = get("JWT_SECRET") {
            config.jwt_secret = secret;
            config.jwt_secret_is_default = false;
        }
        if let Some(raw) = get("JWT_EXPIRATION_SECS") {
            config.jwt_expiration_secs = positive_secs("JWT_EXPIRATION_SECS", &raw)?;
        }
        if let Some(raw) = get("PASSWORD_RESET_TTL_SECS") {
            config.password_reset_ttl_secs = positive_secs("PASSWORD_RESET_TTL_SECS", &raw)?;
        }
        if let Some(from) = get("MAIL_FROM") {
            config.mail_from = from;
        }
        if let Some(url) = get("LOGIN_URL") {
            config.login_url = url;
        }
        if let Some(url) = get("RESET_URL") {
            config.reset_url = url;
        }
        config.database_url = get("DATABASE_URL");
        config.password_pepper = get("PASSWORD_PEPPER");

        Ok(config)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.jwt_expiration_secs)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::seconds(self.password_reset_ttl_secs)
    }
}

fn positive_secs(var: &'static str, raw: &str) -> Result<i64, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason,
    };
    let secs: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    if secs <= 0 {
        return Err(invalid("must be a positive number of seconds".to_string()));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.jwt_expiration_secs, 86_400);
        assert_eq!(config.password_reset_ttl_secs, 900);
        assert_eq!(config.mail_from, "no-reply@example.com");
        assert!(config.jwt_secret_is_default);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRATION_SECS", "3600"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/vocalyx"),
        ])
        .unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(!config.jwt_secret_is_default);
        assert_eq!(config.session_ttl(), Duration::hours(1));
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.database_url.is_some());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = load(&[("JWT_EXPIRATION_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRATION_SECS", .. }));

        let err = load(&[("PASSWORD_RESET_TTL_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PASSWORD_RESET_TTL_SECS", .. }));
    }

    #[test]
    fn debug_hides_secrets() {
        let config = load(&[("JWT_SECRET", "s3cret"), ("PASSWORD_PEPPER", "zesty-pepper")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("zesty-pepper"));
    }
}
