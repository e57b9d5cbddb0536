//! HTTP server for the Evently events API.
//!
//! Wires configuration, storage, cache and authentication into an axum
//! router. The binary entry point lives in `main.rs`.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use server::{API_PREFIX, EventlyServer, ServerBuilder, build_app};
pub use state::AppState;
