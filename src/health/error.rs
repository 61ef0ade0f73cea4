//! Error types for the health probes

use crate::consent::{CacheError, StoreError};
use thiserror::Error;

/// Errors raised while calling a heartbeat endpoint
#[derive(Debug, Error)]
pub enum HeartbeatError {
    /// Transport error, including reqwest's request timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Reasons a dependency check failed
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The gateway shard is not connected
    #[error("Gateway not connected")]
    GatewayDisconnected,

    /// The durable store did not answer
    #[error("Store check failed: {0}")]
    Store(#[from] StoreError),

    /// The cache did not answer
    #[error("Cache check failed: {0}")]
    Cache(#[from] CacheError),
}

/// Result type for heartbeat calls
pub type HeartbeatResult<T> = Result<T, HeartbeatError>;

/// Result type for dependency checks
pub type ProbeResult<T> = Result<T, ProbeError>;
