//! Single reporting sink for probe results
//!
//! Probes never log on their own; they push results here and one task turns
//! them into log events on the health target.

use crate::health::{HealthProbeResult, HeartbeatOutcome};
use crate::{ERROR_TARGET, HEALTH_TARGET};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, warn};

/// Capacity of the report channel
const REPORT_BUFFER: usize = 32;

/// Handle used by probe tasks to publish results
#[derive(Debug, Clone)]
pub struct HealthReporter {
    tx: Sender<HealthProbeResult>,
}

impl HealthReporter {
    /// Create a reporter and the receiving end of its channel
    #[must_use]
    pub fn channel() -> (Self, Receiver<HealthProbeResult>) {
        let (tx, rx) = mpsc::channel(REPORT_BUFFER);
        (Self { tx }, rx)
    }

    pub async fn report(&self, result: HealthProbeResult) {
        if let Err(e) = self.tx.send(result).await {
            warn!(target: HEALTH_TARGET, kind = %e.0.kind, "Health report dropped, reporter closed");
        }
    }
}

/// Log every result until all reporters are dropped
pub async fn drain_reports(mut rx: Receiver<HealthProbeResult>) {
    while let Some(result) = rx.recv().await {
        log_result(&result);
    }
    debug!(target: HEALTH_TARGET, "Health reporter shut down");
}

/// Log one probe result at the level its outcome deserves
pub fn log_result(result: &HealthProbeResult) {
    let kind = result.kind;
    let latency_ms = result
        .latency
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

    if !result.success {
        error!(
            target: ERROR_TARGET,
            probe = %kind,
            error = result.error.as_deref().unwrap_or("unknown"),
            "Health check failed"
        );
        return;
    }

    match &result.heartbeat {
        HeartbeatOutcome::Delivered(status) if result.heartbeat.is_rejected() => {
            warn!(target: HEALTH_TARGET, probe = %kind, status, latency_ms, "Heartbeat rejected");
        }
        HeartbeatOutcome::Delivered(status) => {
            debug!(target: HEALTH_TARGET, probe = %kind, status, latency_ms, "Heartbeat sent");
        }
        HeartbeatOutcome::Failed(reason) => {
            warn!(target: HEALTH_TARGET, probe = %kind, error = %reason, latency_ms, "Heartbeat error");
        }
        HeartbeatOutcome::Skipped => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProbeKind;

    fn result(kind: ProbeKind, success: bool) -> HealthProbeResult {
        HealthProbeResult {
            kind,
            success,
            latency: None,
            error: (!success).then(|| "boom".to_string()),
            heartbeat: HeartbeatOutcome::Skipped,
        }
    }

    #[tokio::test]
    async fn test_reports_arrive_in_order() {
        let (reporter, mut rx) = HealthReporter::channel();

        reporter.report(result(ProbeKind::Gateway, true)).await;
        reporter.report(result(ProbeKind::Store, false)).await;

        assert_eq!(rx.recv().await.unwrap().kind, ProbeKind::Gateway);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, ProbeKind::Store);
        assert!(!second.success);
    }

    #[tokio::test]
    async fn test_report_after_close_does_not_panic() {
        let (reporter, rx) = HealthReporter::channel();
        drop(rx);
        reporter.report(result(ProbeKind::Cache, true)).await;
    }

    #[tokio::test]
    async fn test_drain_ends_when_reporters_drop() {
        let (reporter, rx) = HealthReporter::channel();
        let drain = tokio::spawn(drain_reports(rx));

        reporter.report(result(ProbeKind::Cache, true)).await;
        drop(reporter);

        drain.await.unwrap();
    }
}
