//! Cache counters.

use metrics::counter;

pub(crate) const CACHE_HITS_TOTAL: &str = "evently_cache_hits_total";
pub(crate) const CACHE_MISSES_TOTAL: &str = "evently_cache_misses_total";
pub(crate) const CACHE_ERRORS_TOTAL: &str = "evently_cache_errors_total";

pub(crate) fn record_cache_hit(mode: &'static str) {
    counter!(CACHE_HITS_TOTAL, "mode" => mode).increment(1);
}

pub(crate) fn record_cache_miss(mode: &'static str) {
    counter!(CACHE_MISSES_TOTAL, "mode" => mode).increment(1);
}

pub(crate) fn record_cache_error(operation: &'static str) {
    counter!(CACHE_ERRORS_TOTAL, "operation" => operation).increment(1);
}
