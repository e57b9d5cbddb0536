//! # evently-storage
//!
//! Storage abstraction layer for the Evently API.
//!
//! This crate defines the store traits every backend implements, the storage
//! error taxonomy, a deadline-bound wrapper that applies a fresh timeout to
//! every store operation, and the concurrent joiner used by handlers that
//! need two independently stored records before they can proceed.
//!
//! Lookups return `Ok(None)` for a missing record; `Err` is reserved for
//! infrastructure failures and constraint violations.
//!
//! ## Example
//!
//! ```ignore
//! use evently_storage::{join_two, JoinError, StorageError, Stores};
//!
//! async fn load(stores: &Stores, event_id: i64, user_id: i64) -> Result<(), JoinError<StorageError>> {
//!     let (event, user) = join_two(
//!         stores.events.get_event(event_id),
//!         stores.users.get_user(user_id),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

mod error;
pub mod join;
mod timed;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use join::{JoinError, Slot, join_all, join_two};
pub use timed::{DEFAULT_OPERATION_TIMEOUT, Timed};
pub use traits::{AttendeeStore, EventStore, Stores, UserStore};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;
