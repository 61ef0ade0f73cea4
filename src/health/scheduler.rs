//! Health-check scheduler
//!
//! Each probe runs in its own task on its own interval. A failing or slow
//! probe only delays itself.

use crate::HEALTH_TARGET;
use crate::health::{
    GatewayState, HealthReporter, HeartbeatClient, Probe, drain_reports, run_probe,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// One probe and when to run it
pub struct ProbeSchedule {
    pub probe: Arc<dyn Probe>,
    /// Monitoring endpoint, the probe is disabled when `None`
    pub heartbeat_url: Option<String>,
    pub interval: Duration,
}

/// Running probe tasks
pub struct HealthScheduler {
    tasks: Vec<JoinHandle<()>>,
}

impl HealthScheduler {
    /// Start every enabled probe and a task that logs their results
    #[must_use]
    pub fn start(
        schedules: Vec<ProbeSchedule>,
        heartbeat: Arc<dyn HeartbeatClient>,
        gateway: GatewayState,
    ) -> Self {
        let (reporter, rx) = HealthReporter::channel();
        let mut scheduler = Self::start_with_reporter(schedules, heartbeat, gateway, reporter);
        scheduler.tasks.push(tokio::spawn(drain_reports(rx)));
        scheduler
    }

    /// Start every enabled probe, publishing results to `reporter`
    #[must_use]
    pub fn start_with_reporter(
        schedules: Vec<ProbeSchedule>,
        heartbeat: Arc<dyn HeartbeatClient>,
        gateway: GatewayState,
        reporter: HealthReporter,
    ) -> Self {
        let mut tasks = Vec::new();

        for schedule in schedules {
            let kind = schedule.probe.kind();
            let Some(url) = schedule.heartbeat_url else {
                info!(target: HEALTH_TARGET, probe = %kind, "No heartbeat URL configured, probe disabled");
                continue;
            };

            info!(
                target: HEALTH_TARGET,
                probe = %kind,
                interval_secs = schedule.interval.as_secs(),
                "Scheduling health probe"
            );
            tasks.push(tokio::spawn(probe_loop(
                schedule.probe,
                url,
                schedule.interval,
                heartbeat.clone(),
                gateway.clone(),
                reporter.clone(),
            )));
        }

        Self { tasks }
    }

    /// Number of spawned tasks still running
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
        info!(target: HEALTH_TARGET, "Health probes stopped");
    }
}

async fn probe_loop(
    probe: Arc<dyn Probe>,
    url: String,
    interval: Duration,
    heartbeat: Arc<dyn HeartbeatClient>,
    gateway: GatewayState,
    reporter: HealthReporter,
) {
    gateway.wait_connected().await;
    info!(target: HEALTH_TARGET, probe = %probe.kind(), "Health probe started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let result = run_probe(probe.as_ref(), heartbeat.as_ref(), &url).await;
        reporter.report(result).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{
        HealthProbeResult, HeartbeatOutcome, HeartbeatResult, ProbeError, ProbeKind, ProbeResult,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::Receiver;

    struct FixedProbe {
        kind: ProbeKind,
        healthy: bool,
    }

    #[async_trait]
    impl Probe for FixedProbe {
        fn kind(&self) -> ProbeKind {
            self.kind
        }

        async fn check(&self) -> ProbeResult<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(ProbeError::GatewayDisconnected)
            }
        }
    }

    #[derive(Default)]
    struct RecordingHeartbeat {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HeartbeatClient for RecordingHeartbeat {
        async fn get(&self, url: &str) -> HeartbeatResult<u16> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(200)
        }
    }

    fn schedule(kind: ProbeKind, healthy: bool, url: Option<&str>, secs: u64) -> ProbeSchedule {
        ProbeSchedule {
            probe: Arc::new(FixedProbe { kind, healthy }),
            heartbeat_url: url.map(str::to_string),
            interval: Duration::from_secs(secs),
        }
    }

    fn collect(rx: &mut Receiver<HealthProbeResult>) -> Vec<HealthProbeResult> {
        let mut results = Vec::new();
        while let Ok(result) = rx.try_recv() {
            results.push(result);
        }
        results
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_does_not_block_other_probes() {
        let gateway = GatewayState::new();
        gateway.set_connected(true);
        let heartbeat = Arc::new(RecordingHeartbeat::default());
        let (reporter, mut rx) = HealthReporter::channel();

        let scheduler = HealthScheduler::start_with_reporter(
            vec![
                schedule(ProbeKind::Gateway, true, Some("https://hb/gateway"), 10),
                schedule(ProbeKind::Store, false, Some("https://hb/store"), 10),
                schedule(ProbeKind::Cache, true, Some("https://hb/cache"), 10),
            ],
            heartbeat.clone(),
            gateway,
            reporter,
        );
        assert_eq!(scheduler.running(), 3);

        // Ticks at 0s, 10s, 20s and 30s
        tokio::time::sleep(Duration::from_secs(35)).await;
        let results = collect(&mut rx);

        let count = |kind: ProbeKind, success: bool| {
            results
                .iter()
                .filter(|r| r.kind == kind && r.success == success)
                .count()
        };
        assert_eq!(count(ProbeKind::Gateway, true), 4);
        assert_eq!(count(ProbeKind::Cache, true), 4);
        assert_eq!(count(ProbeKind::Store, false), 4);
        assert!(
            results
                .iter()
                .filter(|r| r.kind == ProbeKind::Store)
                .all(|r| r.heartbeat == HeartbeatOutcome::Skipped)
        );

        let urls = heartbeat.urls.lock().unwrap().clone();
        assert_eq!(urls.iter().filter(|u| *u == "https://hb/gateway").count(), 4);
        assert_eq!(urls.iter().filter(|u| *u == "https://hb/cache").count(), 4);
        assert!(!urls.iter().any(|u| u == "https://hb/store"));

        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_keep_independent_intervals() {
        let gateway = GatewayState::new();
        gateway.set_connected(true);
        let (reporter, mut rx) = HealthReporter::channel();

        let scheduler = HealthScheduler::start_with_reporter(
            vec![
                schedule(ProbeKind::Gateway, true, Some("https://hb/gateway"), 3),
                schedule(ProbeKind::Cache, true, Some("https://hb/cache"), 15),
            ],
            Arc::new(RecordingHeartbeat::default()),
            gateway,
            reporter,
        );

        tokio::time::sleep(Duration::from_secs(16)).await;
        let results = collect(&mut rx);

        // Gateway at 0, 3, 6, 9, 12, 15; cache at 0 and 15
        assert_eq!(results.iter().filter(|r| r.kind == ProbeKind::Gateway).count(), 6);
        assert_eq!(results.iter().filter(|r| r.kind == ProbeKind::Cache).count(), 2);

        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_without_url_is_disabled() {
        let gateway = GatewayState::new();
        gateway.set_connected(true);
        let (reporter, mut rx) = HealthReporter::channel();

        let scheduler = HealthScheduler::start_with_reporter(
            vec![
                schedule(ProbeKind::Gateway, true, None, 10),
                schedule(ProbeKind::Cache, true, Some("https://hb/cache"), 10),
            ],
            Arc::new(RecordingHeartbeat::default()),
            gateway,
            reporter,
        );
        assert_eq!(scheduler.running(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let results = collect(&mut rx);
        assert!(results.iter().all(|r| r.kind == ProbeKind::Cache));

        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_wait_for_gateway() {
        let gateway = GatewayState::new();
        let (reporter, mut rx) = HealthReporter::channel();

        let scheduler = HealthScheduler::start_with_reporter(
            vec![schedule(ProbeKind::Cache, true, Some("https://hb/cache"), 10)],
            Arc::new(RecordingHeartbeat::default()),
            gateway.clone(),
            reporter,
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(collect(&mut rx).is_empty());

        gateway.set_connected(true);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(collect(&mut rx).len(), 1);

        scheduler.shutdown();
    }
}
