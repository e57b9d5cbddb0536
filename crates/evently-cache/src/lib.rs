//! Cache layer for Evently.
//!
//! ## Modes
//!
//! - **Local**: per-instance DashMap with TTL entries and a periodic sweep of
//!   expired ones
//! - **Redis**: shared cache through a deadpool connection pool; every
//!   operation is bounded by the configured Redis timeout
//!
//! Redis mode keeps no local tier, so an invalidation on one instance is
//! visible to every instance on the next read.
//!
//! ## Graceful Degradation
//!
//! If Redis is disabled or unreachable at startup, [`create_cache_backend`]
//! falls back to local mode with a warning.

pub mod backend;
pub mod config;
pub mod error;
pub mod keys;
mod metrics;

pub use backend::{CacheBackend, CacheStats, CacheStore, CachedEntry, spawn_cleanup_task};
pub use config::RedisConfig;
pub use error::CacheError;
pub use keys::{cache_key, principal_key};

use std::time::Duration;

/// Creates the cache backend described by `config`.
///
/// Never fails: any problem reaching Redis degrades to the local cache.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %evently_core::redact_url(&config.url), "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            CacheBackend::new_redis(pool, timeout)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            CacheBackend::new_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_redis_uses_local() {
        let backend = create_cache_backend(&RedisConfig::default()).await;
        assert_eq!(backend.mode(), "local");
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_local() {
        let config = RedisConfig {
            enabled: true,
            url: "redis://127.0.0.1:1".into(),
            pool_size: 2,
            timeout_ms: 200,
        };
        let backend = create_cache_backend(&config).await;
        assert_eq!(backend.mode(), "local");
        assert!(!backend.is_redis_available().await);
    }
}
