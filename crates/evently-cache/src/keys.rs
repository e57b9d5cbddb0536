//! Cache key construction.
//!
//! Keys are `"{namespace}:{id}"`. Namespaces never contain a trailing id
//! segment, so distinct `(namespace, id)` pairs always yield distinct keys.

use evently_core::UserId;

/// Namespace of cached principal snapshots.
pub const PRINCIPAL_NAMESPACE: &str = "evently:user";

pub fn cache_key(namespace: &str, id: i64) -> String {
    format!("{namespace}:{id}")
}

/// Key of the cached public snapshot of user `id`.
pub fn principal_key(id: UserId) -> String {
    cache_key(PRINCIPAL_NAMESPACE, id)
}
