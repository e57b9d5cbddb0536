//! HS256 bearer tokens.
//!
//! Tokens carry the user id (`userId`) and email of the principal plus the
//! standard `iss`, `iat` and `exp` claims. Verification is stateless: there
//! is no revocation list, a token is good until it expires.
//!
//! ## Example
//!
//! ```ignore
//! use evently_auth::token::TokenService;
//!
//! let tokens = TokenService::new(b"secret", "evently", Duration::from_secs(600));
//! let token = tokens.issue(42, "ada@example.com")?;
//! let verified = tokens.verify(&token)?;
//! assert_eq!(verified.user_id, 42);
//! ```

use std::time::Duration;

use evently_core::UserId;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::{AuthConfig, Posture};
use crate::error::AuthError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding { message: String },

    /// The token is malformed.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The algorithm or signature does not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims { message: String },
}

impl JwtError {
    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::invalid_token(err.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by an Evently bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub email: String,
    pub iss: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: UserId,
    pub email: String,
    pub expires_at: OffsetDateTime,
}

// ============================================================================
// Token Service
// ============================================================================

/// Issues and verifies HS256 tokens with a symmetric secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        let issuer = issuer.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer,
            ttl,
            validation,
        }
    }

    /// Builds the service from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when no secret is configured in the
    /// production posture.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        match (config.secret(), config.posture) {
            (Some(secret), _) => Ok(Self::new(
                secret.as_bytes(),
                config.issuer.clone(),
                config.token_ttl,
            )),
            (None, Posture::Production) => Err(AuthError::configuration(
                "auth.jwt_secret is not set; refusing to start in production posture",
            )),
            (None, Posture::Development) => {
                tracing::warn!(
                    "auth.jwt_secret is not set; using a random per-process secret. \
                     Tokens will not survive a restart."
                );
                let mut secret = [0u8; 32];
                OsRng.fill_bytes(&mut secret);
                Ok(Self::new(&secret, config.issuer.clone(), config.token_ttl))
            }
        }
    }

    /// Issues a token for `user_id` that expires after the configured TTL.
    pub fn issue(&self, user_id: UserId, email: &str) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| JwtError::encoding("token lifetime out of range"))?;
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp,
        };
        self.encode(&claims)
    }

    /// Signs arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding(e.to_string()))
    }

    /// Verifies signature, algorithm, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, JwtError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(JwtError::Expired);
        }

        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
            .map_err(|e| JwtError::invalid_claims(e.to_string()))?;

        Ok(VerifiedToken {
            user_id: claims.user_id,
            email: claims.email,
            expires_at,
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// ============================================================================
// Tests
// ============================================================================
