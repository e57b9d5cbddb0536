use serde::{Deserialize, Serialize};

/// Redis connection settings. Disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub pool_size: usize,
    /// Bounds pool waits, connection setup and every cache command.
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            timeout_ms: 5000,
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if !(self.url.starts_with("redis://") || self.url.starts_with("rediss://")) {
            return Err("cache.redis.url must start with redis:// or rediss://".into());
        }
        if self.pool_size == 0 {
            return Err("cache.redis.pool_size must be > 0".into());
        }
        if self.timeout_ms == 0 {
            return Err("cache.redis.timeout_ms must be > 0".into());
        }
        Ok(())
    }
}
