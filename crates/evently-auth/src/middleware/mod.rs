//! HTTP middleware for authentication.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use evently_auth::middleware::{AuthState, CurrentUser, authenticate};
//!
//! async fn me(CurrentUser(user): CurrentUser) -> String {
//!     format!("Hello, {}!", user.name)
//! }
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(auth_state, authenticate));
//! ```

pub mod auth;
pub mod error;

pub use auth::{AuthState, AuthenticatedUser, CurrentUser, authenticate, bearer_token};
