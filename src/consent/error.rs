//! Error types for the consent system
//!
//! Store and cache failures are transient dependency errors. Only
//! [`ConsentError`] crosses the component boundary, when an acceptance could
//! not be recorded.

use thiserror::Error;

/// Errors raised by the durable consent store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store did not answer within its deadline
    #[error("Database call timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// User ID does not fit the store's key column
    #[error("User ID out of range: {0}")]
    InvalidId(u64),
}

/// Errors raised by the volatile cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis driver error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The cache did not answer within its deadline
    #[error("Cache call timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

/// Errors that can occur while recording a consent state transition
#[derive(Debug, Error)]
pub enum ConsentError {
    /// The durable write failed, the acceptance was not recorded
    #[error("Failed to record acceptance: {0}")]
    Store(#[from] StoreError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for consent state transitions
pub type ConsentResult<T> = Result<T, ConsentError>;
