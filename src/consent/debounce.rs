//! Cooldown notice debouncing

use crate::CONSENT_TARGET;
use crate::consent::{KeyValueCache, cooldown_key};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default suppression window for repeated cooldown notices
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(15);

/// Lets through one cooldown notice per (user, command) and window
pub struct CooldownDebouncer {
    cache: Arc<dyn KeyValueCache>,
    window: Duration,
}

impl CooldownDebouncer {
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>, window: Duration) -> Self {
        Self { cache, window }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a cooldown notice should be sent now.
    ///
    /// Only the caller that creates the marker gets `true`, even when several
    /// cooldown hits race. When the cache is down every call returns `true`.
    pub async fn should_notify(&self, user_id: u64, command_name: &str) -> bool {
        let key = cooldown_key(user_id, command_name);
        match self.cache.set_if_absent(&key, self.window).await {
            Ok(created) => created,
            Err(e) => {
                debug!(target: CONSENT_TARGET, user_id, error = %e, "Cooldown marker unavailable");
                true
            }
        }
    }
}
