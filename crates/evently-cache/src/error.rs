use std::time::Duration;

/// Errors surfaced by cache operations.
///
/// Callers treat every variant as a soft failure: the cache is an
/// optimization and the durable store stays authoritative.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("cache command failed: {message}")]
    Command { message: String },

    #[error("cache operation timed out after {after:?}")]
    Timeout { after: Duration },
}

impl CacheError {
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::unavailable(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::command(err.to_string())
    }
}
