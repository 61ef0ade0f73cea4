//! Outbound heartbeat calls to the monitoring service

use crate::health::HeartbeatResult;
use async_trait::async_trait;
use std::time::Duration;

/// Default deadline for one heartbeat request
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for heartbeat endpoints
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HeartbeatClient: Send + Sync {
    /// GET `url`, returning the HTTP status code
    async fn get(&self, url: &str) -> HeartbeatResult<u16>;
}

/// reqwest-backed heartbeat client
#[derive(Debug, Clone)]
pub struct HttpHeartbeat {
    http: reqwest::Client,
}

impl HttpHeartbeat {
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> HeartbeatResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("drew-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HeartbeatClient for HttpHeartbeat {
    async fn get(&self, url: &str) -> HeartbeatResult<u16> {
        let response = self.http.get(url).send().await?;
        Ok(response.status().as_u16())
    }
}
