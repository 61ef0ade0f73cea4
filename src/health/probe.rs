//! Dependency probes and their results

use crate::consent::{ConsentStore, KeyValueCache};
use crate::health::{GatewayState, HeartbeatClient, ProbeError, ProbeResult};
use async_trait::async_trait;
use derive_more::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Which dependency a probe checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ProbeKind {
    #[display("gateway")]
    Gateway,
    #[display("store")]
    Store,
    #[display("cache")]
    Cache,
}

/// A liveness check against one dependency
#[async_trait]
pub trait Probe: Send + Sync {
    fn kind(&self) -> ProbeKind;

    async fn check(&self) -> ProbeResult<()>;
}

/// Healthy once the gateway shard is connected
pub struct GatewayProbe {
    gateway: GatewayState,
}

impl GatewayProbe {
    #[must_use]
    pub fn new(gateway: GatewayState) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Probe for GatewayProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Gateway
    }

    async fn check(&self) -> ProbeResult<()> {
        if self.gateway.is_connected() {
            Ok(())
        } else {
            Err(ProbeError::GatewayDisconnected)
        }
    }
}

/// Round trip against the durable store
pub struct StoreProbe {
    store: Arc<dyn ConsentStore>,
}

impl StoreProbe {
    #[must_use]
    pub fn new(store: Arc<dyn ConsentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Probe for StoreProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Store
    }

    async fn check(&self) -> ProbeResult<()> {
        Ok(self.store.ping().await?)
    }
}

/// Round trip against the cache
pub struct CacheProbe {
    cache: Arc<dyn KeyValueCache>,
}

impl CacheProbe {
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Probe for CacheProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Cache
    }

    async fn check(&self) -> ProbeResult<()> {
        Ok(self.cache.ping().await?)
    }
}

/// What happened to the heartbeat after a probe ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Not sent because the dependency check failed
    Skipped,
    /// Sent, with the monitoring endpoint's status code
    Delivered(u16),
    /// The request itself failed
    Failed(String),
}

impl HeartbeatOutcome {
    /// Delivered with a non-2xx status
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Delivered(status) if !(200..300).contains(status))
    }
}

/// Outcome of one probe iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthProbeResult {
    pub kind: ProbeKind,
    /// Whether the dependency check passed
    pub success: bool,
    /// Duration of the dependency check
    pub latency: Option<Duration>,
    pub error: Option<String>,
    pub heartbeat: HeartbeatOutcome,
}

/// Run the check, and on success call the heartbeat URL
pub async fn run_probe(
    probe: &dyn Probe,
    heartbeat: &dyn HeartbeatClient,
    heartbeat_url: &str,
) -> HealthProbeResult {
    let kind = probe.kind();
    let started = Instant::now();

    if let Err(e) = probe.check().await {
        return HealthProbeResult {
            kind,
            success: false,
            latency: None,
            error: Some(e.to_string()),
            heartbeat: HeartbeatOutcome::Skipped,
        };
    }
    let latency = started.elapsed();

    let heartbeat = match heartbeat.get(heartbeat_url).await {
        Ok(status) => HeartbeatOutcome::Delivered(status),
        Err(e) => HeartbeatOutcome::Failed(e.to_string()),
    };

    HealthProbeResult {
        kind,
        success: true,
        latency: Some(latency),
        error: None,
        heartbeat,
    }
}
