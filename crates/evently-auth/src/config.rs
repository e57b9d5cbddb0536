//! Authentication configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Deployment posture. Decides what happens when no signing secret is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    /// A missing signing secret is a startup error.
    #[default]
    Production,
    /// A missing signing secret is replaced by a random per-process secret.
    /// Tokens stop verifying after a restart.
    Development,
}

/// Token and principal-cache settings.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// jwt_secret = "change-me-to-a-long-random-value"
/// token_ttl = "10m"
/// principal_cache_ttl = "30m"
/// posture = "production"
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Empty counts as unset.
    pub jwt_secret: Option<String>,

    /// Value of the `iss` claim, checked on verification.
    pub issuer: String,

    /// Lifetime of issued tokens.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    /// How long a resolved principal stays in the cache.
    #[serde(with = "humantime_serde")]
    pub principal_cache_ttl: Duration,

    pub posture: Posture,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: "evently".to_string(),
            token_ttl: Duration::from_secs(10 * 60),
            principal_cache_ttl: Duration::from_secs(30 * 60),
            posture: Posture::Production,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("token_ttl", &self.token_ttl)
            .field("principal_cache_ttl", &self.principal_cache_ttl)
            .field("posture", &self.posture)
            .finish()
    }
}

/// Upper bound on `auth.token_ttl`.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

impl AuthConfig {
    /// The configured secret, ignoring empty values.
    pub fn secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.token_ttl.is_zero() {
            return Err("auth.token_ttl must be > 0".into());
        }
        if self.token_ttl > MAX_TOKEN_TTL {
            return Err("auth.token_ttl must not exceed 30 days".into());
        }
        if self.principal_cache_ttl.is_zero() {
            return Err("auth.principal_cache_ttl must be > 0".into());
        }
        if self.issuer.trim().is_empty() {
            return Err("auth.issuer must not be empty".into());
        }
        if self.posture == Posture::Production && self.secret().is_none() {
            return Err(
                "auth.jwt_secret is required when auth.posture = \"production\"".into(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.token_ttl, Duration::from_secs(600));
        assert_eq!(config.principal_cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.posture, Posture::Production);
    }

    #[test]
    fn production_requires_secret() {
        let mut config = AuthConfig::default();
        assert!(config.validate().is_err());
        config.jwt_secret = Some(String::new());
        assert!(config.validate().is_err());
        config.jwt_secret = Some("s3cret-s3cret-s3cret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn token_ttl_is_bounded() {
        let mut config = AuthConfig {
            posture: Posture::Development,
            token_ttl: MAX_TOKEN_TTL,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        config.token_ttl = MAX_TOKEN_TTL + Duration::from_secs(1);
        assert!(config.validate().unwrap_err().contains("auth.token_ttl"));
    }

    #[test]
    fn development_allows_missing_secret() {
        let config = AuthConfig {
            posture: Posture::Development,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn durations_parse_from_humantime() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "jwt_secret": "abc",
            "token_ttl": "15m",
            "principal_cache_ttl": "1h",
            "posture": "development"
        }))
        .unwrap();
        assert_eq!(config.token_ttl, Duration::from_secs(900));
        assert_eq!(config.principal_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.posture, Posture::Development);
    }

    #[test]
    fn debug_redacts_secret() {
        let config = AuthConfig {
            jwt_secret: Some("top-secret".into()),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
