//! Dependency health checks
//!
//! Three probes (gateway, store, cache) run on independent timers once the
//! gateway is connected. Each healthy probe calls its own heartbeat URL so an
//! external monitor can alert on silence. Results funnel through
//! [`HealthReporter`].

mod error;
mod gateway;
mod heartbeat;
mod probe;
mod reporter;
mod scheduler;

pub use error::{HeartbeatError, HeartbeatResult, ProbeError, ProbeResult};
pub use gateway::GatewayState;
pub use heartbeat::{DEFAULT_HEARTBEAT_TIMEOUT, HeartbeatClient, HttpHeartbeat};
pub use probe::{
    CacheProbe, GatewayProbe, HealthProbeResult, HeartbeatOutcome, Probe, ProbeKind, StoreProbe,
    run_probe,
};
pub use reporter::{HealthReporter, drain_reports, log_result};
pub use scheduler::{HealthScheduler, ProbeSchedule};

#[cfg(test)]
pub use heartbeat::MockHeartbeatClient;

use crate::config::HealthConfig;
use crate::consent::{ConsentStore, KeyValueCache};
use std::sync::Arc;

/// Build the three probe schedules from configuration
#[must_use]
pub fn schedules(
    config: &HealthConfig,
    gateway: GatewayState,
    store: Arc<dyn ConsentStore>,
    cache: Arc<dyn KeyValueCache>,
) -> Vec<ProbeSchedule> {
    vec![
        ProbeSchedule {
            probe: Arc::new(GatewayProbe::new(gateway)),
            heartbeat_url: config.gateway_heartbeat_url.clone(),
            interval: config.gateway_interval(),
        },
        ProbeSchedule {
            probe: Arc::new(StoreProbe::new(store)),
            heartbeat_url: config.store_heartbeat_url.clone(),
            interval: config.store_interval(),
        },
        ProbeSchedule {
            probe: Arc::new(CacheProbe::new(cache)),
            heartbeat_url: config.cache_heartbeat_url.clone(),
            interval: config.cache_interval(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::{MemoryCache, MemoryConsentStore};
    use std::time::Duration;

    #[test]
    fn test_schedules_follow_config() {
        let config = HealthConfig {
            gateway_heartbeat_url: Some("https://hb/gateway".to_string()),
            store_heartbeat_url: None,
            cache_heartbeat_url: Some("https://hb/cache".to_string()),
            ..HealthConfig::default()
        };

        let schedules = schedules(
            &config,
            GatewayState::new(),
            Arc::new(MemoryConsentStore::default()),
            Arc::new(MemoryCache::new()),
        );

        let kinds: Vec<_> = schedules.iter().map(|s| s.probe.kind()).collect();
        assert_eq!(kinds, [ProbeKind::Gateway, ProbeKind::Store, ProbeKind::Cache]);
        assert_eq!(schedules[0].interval, Duration::from_secs(180));
        assert_eq!(schedules[1].interval, Duration::from_secs(1800));
        assert_eq!(schedules[2].interval, Duration::from_secs(900));
        assert!(schedules[1].heartbeat_url.is_none());
    }
}
