//! In-memory storage backend for Evently.
//!
//! Records live in papaya lock-free maps. Reads never block; writes that
//! check a uniqueness rule before inserting are serialized so the check and
//! the insert are atomic with respect to each other.

mod storage;

pub use storage::InMemoryStore;
