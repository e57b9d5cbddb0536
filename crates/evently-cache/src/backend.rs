//! Cache backend implementation: local DashMap or shared Redis.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use tokio::task::JoinHandle;

use crate::error::CacheError;
use crate::metrics::{record_cache_error, record_cache_hit, record_cache_miss};

/// Byte-level cache operations used by the principal resolver.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored bytes, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Cache backend selected at startup.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only
    Local(Arc<DashMap<String, CachedEntry>>),

    /// Multi-instance: Redis only, every command bounded by `timeout`
    Redis { redis: Pool, timeout: Duration },
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Local(map) => f.debug_tuple("Local").field(&map.len()).finish(),
            CacheBackend::Redis { timeout, .. } => f
                .debug_struct("Redis")
                .field("timeout", timeout)
                .finish_non_exhaustive(),
        }
    }
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(redis_pool: Pool, timeout: Duration) -> Self {
        CacheBackend::Redis {
            redis: redis_pool,
            timeout,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis { .. } => "redis",
        }
    }

    /// Get cache statistics. Redis mode reports no local entries.
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                local_entries: map.len(),
                mode: self.mode(),
            },
            CacheBackend::Redis { .. } => CacheStats {
                local_entries: 0,
                mode: self.mode(),
            },
        }
    }

    /// Check if Redis is available (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => false,
            CacheBackend::Redis { redis, timeout } => {
                matches!(tokio::time::timeout(*timeout, redis.get()).await, Ok(Ok(_)))
            }
        }
    }

    /// Removes expired local entries. Returns the number removed.
    ///
    /// A no-op in Redis mode, where Redis expires keys itself.
    pub fn cleanup_expired(&self) -> usize {
        let CacheBackend::Local(map) = self else {
            return 0;
        };
        let mut removed = 0;
        map.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(timeout, fut)
            .await
            .unwrap_or(Err(CacheError::Timeout { after: timeout }))
    }
}

#[async_trait]
impl CacheStore for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.remove_if(key, |_, entry| entry.is_expired());
                let result = map.get(key).map(|entry| entry.data.as_ref().clone());

                if result.is_some() {
                    tracing::debug!(key = %key, "cache hit (local)");
                    record_cache_hit("local");
                } else {
                    tracing::debug!(key = %key, "cache miss (local)");
                    record_cache_miss("local");
                }
                Ok(result)
            }
            CacheBackend::Redis { redis, timeout } => {
                let result = Self::bounded(*timeout, async {
                    let mut conn = redis.get().await?;
                    let value: Option<Vec<u8>> = conn.get(key).await?;
                    Ok::<_, CacheError>(value)
                })
                .await;

                match &result {
                    Ok(Some(_)) => {
                        tracing::debug!(key = %key, "cache hit (redis)");
                        record_cache_hit("redis");
                    }
                    Ok(None) => {
                        tracing::debug!(key = %key, "cache miss (redis)");
                        record_cache_miss("redis");
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis GET error");
                        record_cache_error("get");
                    }
                }
                result
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
                Ok(())
            }
            CacheBackend::Redis { redis, timeout } => {
                let ttl_secs = ttl.as_secs().max(1);
                let result = Self::bounded(*timeout, async {
                    let mut conn = redis.get().await?;
                    conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
                    Ok::<_, CacheError>(())
                })
                .await;

                match &result {
                    Ok(()) => tracing::debug!(key = %key, ttl_secs, "cache set (redis)"),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis SET error");
                        record_cache_error("set");
                    }
                }
                result
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
                tracing::debug!(key = %key, "cache invalidated (local)");
                Ok(())
            }
            CacheBackend::Redis { redis, timeout } => {
                let result = Self::bounded(*timeout, async {
                    let mut conn = redis.get().await?;
                    conn.del::<_, ()>(key).await?;
                    Ok::<_, CacheError>(())
                })
                .await;

                match &result {
                    Ok(()) => tracing::debug!(key = %key, "cache invalidated (redis)"),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis DEL error");
                        record_cache_error("delete");
                    }
                }
                result
            }
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub local_entries: usize,
    pub mode: &'static str,
}

/// Starts a background task that sweeps expired local entries every
/// `interval`. Returns `None` in Redis mode.
pub fn spawn_cleanup_task(backend: &CacheBackend, interval: Duration) -> Option<JoinHandle<()>> {
    if !matches!(backend, CacheBackend::Local(_)) {
        return None;
    }
    let backend = backend.clone();
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = backend.cleanup_expired();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            }
        }
    }))
}
