//! Cache-aside resolution of the authenticated principal.
//!
//! ```text
//! resolve(id) → cache GET evently:user:{id}
//!                 ├─ hit, decodes  → PublicUser
//!                 └─ miss / error / corrupt
//!                      → store get_user(id)
//!                          ├─ None  → Unauthorized
//!                          ├─ Err   → Unavailable
//!                          └─ Some  → cache SET (errors ignored) → PublicUser
//! ```
//!
//! Only [`PublicUser`] snapshots are ever written to the cache, so a password
//! hash can never be served from it.

use std::sync::Arc;
use std::time::Duration;

use evently_cache::{CacheStore, principal_key};
use evently_core::{PublicUser, UserId};
use evently_storage::UserStore;
use tracing::{debug, error, warn};

use crate::error::AuthError;

/// Resolves principals through the cache, falling back to the user store.
#[derive(Clone)]
pub struct PrincipalResolver {
    users: Arc<dyn UserStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl PrincipalResolver {
    pub fn new(users: Arc<dyn UserStore>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { users, cache, ttl }
    }

    /// Returns the public snapshot of `user_id`.
    ///
    /// Performs at most one store read and never retries.
    pub async fn resolve(&self, user_id: UserId) -> Result<PublicUser, AuthError> {
        let key = principal_key(user_id);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PublicUser>(&bytes) {
                Ok(user) => {
                    debug!(user_id, "Principal resolved from cache");
                    return Ok(user);
                }
                Err(e) => warn!(user_id, error = %e, "Discarding corrupt cached principal"),
            },
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "Principal cache read failed"),
        }

        let user = match self.users.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AuthError::unauthorized("User not found")),
            Err(e) => {
                error!(user_id, error = %e, "Failed to load principal");
                return Err(AuthError::unavailable(e.to_string()));
            }
        };

        let public = user.to_public();
        match serde_json::to_vec(&public) {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, bytes, self.ttl).await {
                    warn!(user_id, error = %e, "Principal cache write failed");
                }
            }
            Err(e) => warn!(user_id, error = %e, "Failed to encode principal for cache"),
        }

        debug!(user_id, "Principal resolved from store");
        Ok(public)
    }

    /// Drops the cached snapshot of `user_id`. Failures are logged only.
    pub async fn invalidate(&self, user_id: UserId) {
        if let Err(e) = self.cache.delete(&principal_key(user_id)).await {
            warn!(user_id, error = %e, "Principal cache invalidation failed");
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evently_cache::{CacheBackend, CacheError};
    use evently_core::{NewUser, User, UserPatch};
    use evently_db_memory::InMemoryStore;
    use evently_storage::StorageError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts `get_user` calls and can be switched to fail.
    struct CountingUsers {
        inner: InMemoryStore,
        reads: AtomicUsize,
        fail: bool,
    }

    impl CountingUsers {
        fn new(fail: bool) -> Self {
            Self {
                inner: InMemoryStore::new(),
                reads: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl UserStore for CountingUsers {
        async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::connection("connection refused"));
            }
            self.inner.get_user(id).await
        }
        async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
            self.inner.get_user_by_email(email).await
        }
        async fn list_users(&self) -> Result<Vec<User>, StorageError> {
            self.inner.list_users().await
        }
        async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
            self.inner.create_user(user).await
        }
        async fn update_user(
            &self,
            id: UserId,
            patch: &UserPatch,
        ) -> Result<Option<User>, StorageError> {
            self.inner.update_user(id, patch).await
        }
        async fn delete_user(&self, id: UserId) -> Result<bool, StorageError> {
            self.inner.delete_user(id).await
        }
    }

    /// A cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
    }

    async fn seeded(fail: bool) -> (Arc<CountingUsers>, UserId) {
        let users = Arc::new(CountingUsers::new(fail));
        let user = users
            .inner
            .create_user(NewUser {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            })
            .await
            .unwrap();
        (users, user.id)
    }

    fn resolver(users: Arc<CountingUsers>, cache: Arc<dyn CacheStore>) -> PrincipalResolver {
        PrincipalResolver::new(users, cache, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn cold_cache_reads_store_once_then_hits() {
        let (users, id) = seeded(false).await;
        let resolver = resolver(users.clone(), Arc::new(CacheBackend::new_local()));

        let first = resolver.resolve(id).await.unwrap();
        let second = resolver.resolve(id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.email, "ada@example.com");
        assert_eq!(users.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_bytes_never_contain_password_hash() {
        let (users, id) = seeded(false).await;
        let cache = Arc::new(CacheBackend::new_local());
        resolver(users, cache.clone()).resolve(id).await.unwrap();

        let bytes = cache.get(&principal_key(id)).await.unwrap().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("argon2"));
        assert!(!text.to_lowercase().contains("password"));
    }

    #[tokio::test]
    async fn invalidate_forces_store_read() {
        let (users, id) = seeded(false).await;
        let resolver = resolver(users.clone(), Arc::new(CacheBackend::new_local()));

        resolver.resolve(id).await.unwrap();
        resolver.invalidate(id).await;
        resolver.resolve(id).await.unwrap();
        assert_eq!(users.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let (users, _) = seeded(false).await;
        let err = resolver(users, Arc::new(CacheBackend::new_local()))
            .resolve(999)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn store_failure_is_unavailable() {
        let (users, id) = seeded(true).await;
        let err = resolver(users, Arc::new(CacheBackend::new_local()))
            .resolve(id)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_store() {
        let (users, id) = seeded(false).await;
        let resolver = resolver(users.clone(), Arc::new(BrokenCache));

        assert_eq!(resolver.resolve(id).await.unwrap().id, id);
        assert_eq!(resolver.resolve(id).await.unwrap().id, id);
        resolver.invalidate(id).await;
        assert_eq!(users.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let (users, id) = seeded(false).await;
        let cache = Arc::new(CacheBackend::new_local());
        cache
            .set(&principal_key(id), b"{not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let resolver = resolver(users.clone(), cache.clone());
        assert_eq!(resolver.resolve(id).await.unwrap().id, id);
        assert_eq!(users.reads.load(Ordering::SeqCst), 1);
        // The corrupt entry was overwritten with a good snapshot.
        resolver.resolve(id).await.unwrap();
        assert_eq!(users.reads.load(Ordering::SeqCst), 1);
    }
}
