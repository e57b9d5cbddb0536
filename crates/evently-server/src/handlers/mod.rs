//! Route handlers for the `/api/v1` surface and the health probes.

pub mod attendees;
pub mod auth;
pub mod events;
pub mod health;
pub mod users;

use evently_api::ApiError;

/// Runs a CPU-bound password operation on the blocking pool.
async fn blocking<T, E>(f: impl FnOnce() -> Result<T, E> + Send + 'static) -> Result<T, ApiError>
where
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("password task failed: {e}")))?
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))
}
