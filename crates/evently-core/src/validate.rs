//! Field validation rules applied to client input.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, Result};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Checks that `value` looks like an email address.
pub fn validate_email(field: &'static str, value: &str) -> Result<()> {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(CoreError::validation(field, "must be a valid email address"))
    }
}

/// Checks that `value` has at least `min` characters.
pub fn validate_min_length(field: &'static str, value: &str, min: usize) -> Result<()> {
    if value.chars().count() < min {
        return Err(CoreError::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(())
}

/// Checks that `value` has between `min` and `max` characters, inclusive.
pub fn validate_length(field: &'static str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(CoreError::validation(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("email", "ada@example.com").is_ok());
        assert!(validate_email("email", "a.b+c@sub.example.org").is_ok());
        assert!(validate_email("email", "ada").is_err());
        assert!(validate_email("email", "ada@example").is_err());
        assert!(validate_email("email", "ada @example.com").is_err());
        assert!(validate_email("email", "").is_err());
    }

    #[test]
    fn min_length_counts_chars() {
        assert!(validate_min_length("name", "Ada", 3).is_ok());
        assert!(validate_min_length("name", "Al", 3).is_err());
        assert!(validate_min_length("name", "Zoë", 3).is_ok());
    }

    #[test]
    fn bounded_length() {
        assert!(validate_length("password", "secret", 6, 64).is_ok());
        assert!(validate_length("password", "short", 6, 64).is_err());
        let long = "x".repeat(65);
        let err = validate_length("password", &long, 6, 64).unwrap_err();
        assert_eq!(err.field(), Some("password"));
        assert_eq!(err.to_string(), "password: must be between 6 and 64 characters");
    }
}
