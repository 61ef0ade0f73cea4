//! Explicit outcomes for cache and store reads

use std::fmt::Display;

/// Outcome of a read against a dependency that may be down.
///
/// Callers branch on the variant instead of treating every error as fatal:
/// the gate treats `Unavailable` from the cache as a miss, and from the store
/// as "cannot decide right now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The value exists
    Found(T),
    /// The dependency answered, the value does not exist
    NotFound,
    /// The dependency could not be consulted
    Unavailable(String),
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl Lookup<()> {
    /// Map an existence check to a lookup
    pub fn presence<E: Display>(result: Result<bool, E>) -> Self {
        match result {
            Ok(true) => Self::Found(()),
            Ok(false) => Self::NotFound,
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}

impl<T, E: Display> From<Result<Option<T>, E>> for Lookup<T> {
    fn from(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::NotFound,
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}
