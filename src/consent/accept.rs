//! Acceptance flow
//!
//! Turns an Accept button press into the durable `accepted = true` transition.

use crate::consent::{ConsentResult, ConsentStore, KeyValueCache, tos_key};
use crate::{CONSENT_TARGET, ERROR_TARGET};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Proof that the acceptance was recorded durably
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub user_id: u64,
}

/// Records acceptances in the store, then warms the cache
pub struct AcceptanceFlow {
    store: Arc<dyn ConsentStore>,
    cache: Arc<dyn KeyValueCache>,
}

impl AcceptanceFlow {
    #[must_use]
    pub fn new(store: Arc<dyn ConsentStore>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self { store, cache }
    }

    /// Record that `user_id` accepted the Terms of Service.
    ///
    /// Safe to call any number of times. The cache write is best effort: if
    /// it fails the next invocation simply reads the store again.
    ///
    /// # Errors
    ///
    /// Returns a `ConsentError` if the durable write failed. No confirmation
    /// may be shown in that case.
    pub async fn on_accept(&self, user_id: u64) -> ConsentResult<Confirmation> {
        if let Err(e) = self.store.accept(user_id).await {
            error!(
                target: ERROR_TARGET,
                user_id,
                error = %e,
                "Failed to record Terms of Service acceptance"
            );
            return Err(e.into());
        }

        if let Err(e) = self.cache.set(&tos_key(user_id), None).await {
            warn!(target: CONSENT_TARGET, user_id, error = %e, "Failed to cache acceptance");
        }

        info!(target: CONSENT_TARGET, user_id, "Terms of Service accepted");
        Ok(Confirmation { user_id })
    }
}
