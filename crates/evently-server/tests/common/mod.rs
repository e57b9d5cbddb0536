#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use evently_auth::TokenService;
use evently_cache::CacheBackend;
use evently_core::{NewUser, User, UserId, UserPatch};
use evently_db_memory::InMemoryStore;
use evently_server::{AppState, build_app};
use evently_storage::{StorageError, Stores, UserStore};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &[u8] = b"integration-test-secret";

/// User store that counts `get_user` calls and can be switched to fail them.
pub struct CountingUsers {
    inner: Arc<InMemoryStore>,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl CountingUsers {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for CountingUsers {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
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

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub users: Arc<CountingUsers>,
    pub tokens: Arc<TokenService>,
    pub cache: Arc<CacheBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let users = Arc::new(CountingUsers {
            inner: store.clone(),
            reads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        });
        let stores = Stores {
            users: users.clone(),
            events: store.clone(),
            attendees: store.clone(),
        }
        .with_deadline(Duration::from_secs(5));
        let cache = Arc::new(CacheBackend::new_local());
        let tokens = Arc::new(TokenService::new(
            SECRET,
            "evently",
            Duration::from_secs(600),
        ));
        let state = AppState::new(stores, cache.clone(), tokens.clone(), Duration::from_secs(60));

        Self {
            router: build_app(state, 1024 * 1024),
            store,
            users,
            tokens,
            cache,
        }
    }

    /// Inserts a user directly, bypassing registration and password hashing.
    pub async fn seed_user(&self, email: &str, name: &str) -> User {
        self.store
            .create_user(NewUser {
                email: email.into(),
                name: name.into(),
                password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        self.tokens.issue(user.id, &user.email).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Sends `method path` as `user`.
    pub async fn as_user(
        &self,
        user: &User,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let bearer = format!("Bearer {}", self.token_for(user));
        self.request(method, path, Some(&bearer), body).await
    }
}

pub fn event_body(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "description": "A long enough description",
        "date": "2026-06-01T18:00:00Z",
        "location": "Main hall",
    })
}
