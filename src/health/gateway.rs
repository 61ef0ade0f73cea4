//! Gateway connection state shared between the event handler and the probes

use std::sync::Arc;
use tokio::sync::watch;

/// Whether the gateway shard is currently connected.
///
/// Written by the event handler on ready/resume/stage changes, read by the
/// gateway probe and awaited by every probe before its first run.
#[derive(Debug, Clone)]
pub struct GatewayState {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayState {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn set_connected(&self, connected: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the gateway is connected
    pub async fn wait_connected(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|connected| *connected).await;
    }
}
