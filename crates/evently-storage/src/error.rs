//! Storage error types.
//!
//! A missing record is not an error: lookups return `Ok(None)`. The variants
//! here cover constraint violations and infrastructure failures.

use std::fmt;
use std::time::Duration;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the violated constraint.
        message: String,
    },

    /// The operation did not finish within its deadline.
    #[error("Operation {operation} timed out after {after:?}")]
    Timeout {
        /// Name of the store operation.
        operation: &'static str,
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a conflict error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Timeout { .. } | Self::Connection { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Uniqueness conflict.
    Conflict,
    /// Infrastructure/connection error, including deadlines.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::conflict("email already registered");
        assert_eq!(err.to_string(), "Conflict: email already registered");

        let err = StorageError::timeout("get_user", Duration::from_secs(5));
        assert_eq!(err.to_string(), "Operation get_user timed out after 5s");
    }

    #[test]
    fn test_error_predicates() {
        assert!(StorageError::conflict("x").is_conflict());
        assert!(!StorageError::conflict("x").is_timeout());
        assert!(StorageError::timeout("op", Duration::from_millis(1)).is_timeout());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::conflict("x").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            StorageError::timeout("op", Duration::from_secs(1)).category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            StorageError::connection("refused").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            StorageError::internal("boom").category(),
            ErrorCategory::Internal
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
