use std::net::SocketAddr;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use evently_auth::{AuthState, authenticate};
use evently_cache::spawn_cleanup_task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    handlers::{attendees, auth, events, health, users},
    middleware::{self as app_middleware, RequestId},
    state::AppState,
};

pub const API_PREFIX: &str = "/api/v1";

/// Builds the full router. Everything under `/api/v1` except registration
/// and login passes the authentication gate first.
pub fn build_app(state: AppState, body_limit: usize) -> Router {
    let gate = middleware::from_fn_with_state(AuthState::from_ref(&state), authenticate);

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/users", get(users::list))
        .route("/users/me", get(users::me))
        .route(
            "/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/events", get(events::list).post(events::create))
        .route(
            "/events/{id}",
            get(events::get).put(events::update).delete(events::delete),
        )
        .route("/events/{id}/attendees", get(events::list_attendees))
        .route(
            "/events/{id}/attendees/{user_id}",
            post(events::add_attendee).delete(events::remove_attendee),
        )
        .route("/attendees", get(attendees::list))
        .route(
            "/attendees/{id}",
            get(attendees::get).delete(attendees::delete),
        )
        .route("/attendees/{id}/events", get(attendees::user_events))
        .route_layer(gate);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .nest(API_PREFIX, public.merge(protected))
        // Outermost last: body limit -> request id -> cors -> trace
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .map(|id| id.as_str().to_string())
                        .unwrap_or_default();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id,
                        user_id = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("http.status_code", res.status().as_u16());
                        tracing::info!(
                            http.status = res.status().as_u16(),
                            elapsed_ms = latency.as_millis() as u64,
                            "request handled"
                        );
                    },
                ),
        )
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    config: AppConfig,
    state: Option<AppState>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            state: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Uses pre-built state instead of building it from the config.
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub async fn build(self) -> anyhow::Result<EventlyServer> {
        let state = match self.state {
            Some(state) => state,
            None => AppState::from_config(&self.config).await?,
        };
        let cleanup = spawn_cleanup_task(&state.cache, self.config.cache.cleanup_interval);
        let app = build_app(state, self.config.server.body_limit_bytes);

        Ok(EventlyServer {
            addr: self.config.addr(),
            app,
            cleanup,
        })
    }
}

pub struct EventlyServer {
    addr: SocketAddr,
    app: Router,
    cleanup: Option<tokio::task::JoinHandle<()>>,
}

impl EventlyServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        if let Some(cleanup) = self.cleanup {
            cleanup.abort();
        }
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
