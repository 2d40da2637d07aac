//! Token lifetimes, signing material, and cookie scoping.

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_ISSUER: &str = "evcharge";
const DEFAULT_AUDIENCE: &str = "evcharge-clients";
const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
const DEFAULT_REFRESH_THRESHOLD_SECONDS: i64 = 5 * 60;
const DEFAULT_ACCESS_COOKIE_PATH: &str = "/api";
const DEFAULT_REFRESH_COOKIE_PATH: &str = "/api/auth/refresh";
const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT signing secret must be at least {MIN_SECRET_BYTES} bytes")]
    SecretTooShort,
    #[error("access token lifetime must be positive")]
    AccessLifetime,
    #[error("refresh token lifetime must be positive")]
    RefreshLifetime,
    #[error("cookie path must start with '/': {0}")]
    CookiePath(String),
}

/// Immutable once built; shared by the issuer, the service, and the HTTP layer.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_secret: SecretString,
    issuer: String,
    audience: String,
    access_token_minutes: i64,
    refresh_token_days: i64,
    refresh_threshold_seconds: i64,
    access_cookie_path: String,
    refresh_cookie_path: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: SecretString) -> Self {
        Self {
            signing_secret,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_token_minutes: DEFAULT_ACCESS_TOKEN_MINUTES,
            refresh_token_days: DEFAULT_REFRESH_TOKEN_DAYS,
            refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECONDS,
            access_cookie_path: DEFAULT_ACCESS_COOKIE_PATH.to_string(),
            refresh_cookie_path: DEFAULT_REFRESH_COOKIE_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_access_token_minutes(mut self, minutes: i64) -> Self {
        self.access_token_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_refresh_token_days(mut self, days: i64) -> Self {
        self.refresh_token_days = days;
        self
    }

    #[must_use]
    pub fn with_access_cookie_path(mut self, path: String) -> Self {
        self.access_cookie_path = path;
        self
    }

    #[must_use]
    pub fn with_refresh_cookie_path(mut self, path: String) -> Self {
        self.refresh_cookie_path = path;
        self
    }

    /// Reject configurations that would produce weak or unusable tokens.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.expose_secret().len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort);
        }
        if self.access_token_minutes <= 0 {
            return Err(ConfigError::AccessLifetime);
        }
        if self.refresh_token_days <= 0 {
            return Err(ConfigError::RefreshLifetime);
        }
        for path in [&self.access_cookie_path, &self.refresh_cookie_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::CookiePath(path.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn access_token_lifetime(&self) -> Duration {
        Duration::minutes(self.access_token_minutes)
    }

    #[must_use]
    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::days(self.refresh_token_days)
    }

    /// Remaining access-token lifetime at or below which the interceptor renews.
    #[must_use]
    pub fn refresh_threshold(&self) -> Duration {
        Duration::seconds(self.refresh_threshold_seconds)
    }

    #[must_use]
    pub fn access_cookie_path(&self) -> &str {
        &self.access_cookie_path
    }

    #[must_use]
    pub fn refresh_cookie_path(&self) -> &str {
        &self.refresh_cookie_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(len: usize) -> SecretString {
        SecretString::from("k".repeat(len))
    }

    #[test]
    fn defaults() {
        let config = AuthConfig::new(secret(32));
        assert_eq!(config.issuer(), "evcharge");
        assert_eq!(config.audience(), "evcharge-clients");
        assert_eq!(config.access_token_lifetime(), Duration::minutes(15));
        assert_eq!(config.refresh_token_lifetime(), Duration::days(7));
        assert_eq!(config.refresh_threshold(), Duration::minutes(5));
        assert_eq!(config.access_cookie_path(), "/api");
        assert_eq!(config.refresh_cookie_path(), "/api/auth/refresh");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn short_secret_is_rejected() {
        let config = AuthConfig::new(secret(31));
        assert_eq!(config.validate(), Err(ConfigError::SecretTooShort));
    }

    #[test]
    fn non_positive_lifetimes_are_rejected() {
        let config = AuthConfig::new(secret(32)).with_access_token_minutes(0);
        assert_eq!(config.validate(), Err(ConfigError::AccessLifetime));

        let config = AuthConfig::new(secret(32)).with_refresh_token_days(-1);
        assert_eq!(config.validate(), Err(ConfigError::RefreshLifetime));
    }

    #[test]
    fn relative_cookie_path_is_rejected() {
        let config = AuthConfig::new(secret(32)).with_refresh_cookie_path("api".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::CookiePath("api".to_string()))
        );
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let config = AuthConfig::new(SecretString::from("super-secret-signing-key-0123456789"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-signing-key"));
    }
}
