//! Shared application state.
//!
//! Stores, cache and signing secret are built once at startup and injected
//! into every handler through axum `State`.

use std::sync::Arc;

use axum::extract::FromRef;
use evently_auth::{AuthState, PrincipalResolver, TokenService};
use evently_cache::{CacheBackend, create_cache_backend};
use evently_db_memory::InMemoryStore;
use evently_db_postgres::PgStore;
use evently_storage::Stores;

use crate::config::{AppConfig, StorageBackend};

#[derive(Clone, Debug)]
pub struct AppState {
    pub stores: Stores,
    pub tokens: Arc<TokenService>,
    pub resolver: PrincipalResolver,
    pub cache: Arc<CacheBackend>,
}

impl AppState {
    /// Wires the resolver to `stores.users` and `cache`.
    pub fn new(
        stores: Stores,
        cache: Arc<CacheBackend>,
        tokens: Arc<TokenService>,
        principal_ttl: std::time::Duration,
    ) -> Self {
        let resolver = PrincipalResolver::new(stores.users.clone(), cache.clone(), principal_ttl);
        Self {
            stores,
            tokens,
            resolver,
            cache,
        }
    }

    /// Builds the state described by `cfg`: storage backend wrapped in the
    /// per-operation deadline, cache backend and token service.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let stores = match cfg.storage.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage");
                Stores::from_backend(Arc::new(InMemoryStore::new()))
            }
            StorageBackend::Postgres => {
                let store =
                    PgStore::connect(&cfg.storage.postgres, cfg.storage.operation_timeout).await?;
                tracing::info!("Using PostgreSQL storage");
                Stores::from_backend(Arc::new(store))
            }
        }
        .with_deadline(cfg.storage.operation_timeout);

        let cache = Arc::new(create_cache_backend(&cfg.cache.redis).await);
        let tokens = Arc::new(TokenService::from_config(&cfg.auth)?);

        Ok(Self::new(
            stores,
            cache,
            tokens,
            cfg.auth.principal_cache_ttl,
        ))
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        AuthState::new(state.tokens.clone(), state.resolver.clone())
    }
}
