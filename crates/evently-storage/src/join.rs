//! Concurrent fan-out/fan-in of independent fetches.
//!
//! Each fetch yields `Result<Option<T>, E>`. The joiner polls all of them
//! concurrently, waits until every one has finished, and only then decides
//! the outcome:
//!
//! 1. any `Err` wins, reported for the lowest slot that failed;
//! 2. otherwise any `None` is reported as not found, again lowest slot first;
//! 3. otherwise all values are returned together.
//!
//! The joiner has no timeout and never retries. Deadlines belong to the
//! fetches themselves (see [`crate::Timed`]).

use std::fmt;
use std::future::Future;

use futures_util::future;

/// Position of a fetch in a join, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(pub usize);

impl Slot {
    pub const FIRST: Slot = Slot(0);
    pub const SECOND: Slot = Slot(1);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "first"),
            1 => write!(f, "second"),
            n => write!(f, "slot {n}"),
        }
    }
}

/// Why a join did not produce all of its values.
#[derive(Debug, thiserror::Error)]
pub enum JoinError<E> {
    /// The fetch in `slot` returned an error.
    #[error("fetch in {slot} slot failed: {source}")]
    Failed {
        slot: Slot,
        #[source]
        source: E,
    },

    /// The fetch in `slot` found nothing.
    #[error("fetch in {slot} slot found nothing")]
    NotFound { slot: Slot },
}

impl<E> JoinError<E> {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Failed { slot, .. } | Self::NotFound { slot } => *slot,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Runs two fetches concurrently and joins their results.
///
/// Both fetches always run to completion, even when one of them fails early.
pub async fn join_two<A, B, E, FA, FB>(fetch_a: FA, fetch_b: FB) -> Result<(A, B), JoinError<E>>
where
    FA: Future<Output = Result<Option<A>, E>>,
    FB: Future<Output = Result<Option<B>, E>>,
{
    let (a, b) = tokio::join!(fetch_a, fetch_b);

    match (a, b) {
        (Err(source), _) => Err(JoinError::Failed {
            slot: Slot::FIRST,
            source,
        }),
        (_, Err(source)) => Err(JoinError::Failed {
            slot: Slot::SECOND,
            source,
        }),
        (Ok(None), _) => Err(JoinError::NotFound { slot: Slot::FIRST }),
        (_, Ok(None)) => Err(JoinError::NotFound { slot: Slot::SECOND }),
        (Ok(Some(a)), Ok(Some(b))) => Ok((a, b)),
    }
}

/// Runs any number of same-typed fetches concurrently and joins their
/// results in input order.
pub async fn join_all<T, E, F, I>(fetches: I) -> Result<Vec<T>, JoinError<E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<Option<T>, E>>,
{
    let results = future::join_all(fetches).await;

    let mut not_found = None;
    let mut values = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Err(source) => {
                return Err(JoinError::Failed {
                    slot: Slot(index),
                    source,
                });
            }
            Ok(None) => {
                not_found.get_or_insert(Slot(index));
            }
            Ok(Some(value)) => values.push(value),
        }
    }

    match not_found {
        Some(slot) => Err(JoinError::NotFound { slot }),
        None => Ok(values),
    }
}
