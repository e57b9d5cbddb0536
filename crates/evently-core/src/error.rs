use thiserror::Error;

/// Errors raised while validating domain input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("no fields to update")]
    EmptyPatch,
}

impl CoreError {
    /// Create a new Validation error
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Field that failed validation, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::EmptyPatch => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
