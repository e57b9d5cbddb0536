//! Authentication error types.

use crate::token::JwtError;

/// Rejections produced by the authentication gate and the auth handlers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("Missing Authorization header")]
    MissingHeader,

    /// The `Authorization` header is not `Bearer <token>`.
    #[error("Authorization header must use the Bearer scheme")]
    MalformedScheme,

    /// The token could not be parsed or its claims are wrong.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// The algorithm or signature does not match.
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    /// The token is valid but names no existing principal.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The principal could not be resolved because a backend failed.
    #[error("Authentication backend unavailable: {message}")]
    Unavailable { message: String },

    /// Authentication is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AuthError {
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedScheme => "malformed_scheme",
            Self::InvalidToken { .. } => "invalid_token",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Unavailable { .. } => "unavailable",
            Self::Configuration { .. } => "configuration",
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::Expired,
            JwtError::InvalidSignature => Self::InvalidSignature,
            JwtError::Encoding { message } => Self::Configuration { message },
            JwtError::InvalidToken { message } | JwtError::InvalidClaims { message } => {
                Self::InvalidToken { message }
            }
        }
    }
}
