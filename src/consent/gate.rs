//! Consent gate
//!
//! Runs before every command. Known acceptors are answered from the cache;
//! everyone else goes to the durable store, which is the source of truth.

use crate::CONSENT_TARGET;
use crate::consent::{
    ConsentPrompt, ConsentRecord, ConsentStore, KeyValueCache, Lookup, tos_key,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the dispatch layer needs to know about one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub user_id: u64,
    pub command_name: String,
    /// Client locale, e.g. `en-US`. Only slash commands carry one.
    pub locale: Option<String>,
}

impl Invocation {
    #[must_use]
    pub fn new(user_id: u64, command_name: impl Into<String>, locale: Option<&str>) -> Self {
        Self {
            user_id,
            command_name: command_name.into(),
            locale: locale.map(str::to_string),
        }
    }
}

/// Outcome of the gate for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Run the command
    Allow,
    /// Do not run the command, show the prompt instead
    Deny(ConsentPrompt),
    /// The store could not be consulted, do not run the command
    Unavailable,
}

/// Per-command consent interceptor
pub struct ConsentGate {
    store: Arc<dyn ConsentStore>,
    cache: Arc<dyn KeyValueCache>,
    owners: HashSet<u64>,
}

impl ConsentGate {
    #[must_use]
    pub fn new(
        store: Arc<dyn ConsentStore>,
        cache: Arc<dyn KeyValueCache>,
        owners: HashSet<u64>,
    ) -> Self {
        Self {
            store,
            cache,
            owners,
        }
    }

    /// Decide whether the invoking user may run the command
    pub async fn authorize(&self, invocation: &Invocation) -> Decision {
        let user_id = invocation.user_id;
        let command = invocation.command_name.as_str();

        if self.owners.contains(&user_id) {
            debug!(target: CONSENT_TARGET, user_id, command, "Owner bypass");
            return Decision::Allow;
        }

        let key = tos_key(user_id);
        match Lookup::presence(self.cache.exists(&key).await) {
            Lookup::Found(()) => {
                debug!(target: CONSENT_TARGET, user_id, command, "Allowed from cache");
                return Decision::Allow;
            }
            Lookup::NotFound => {}
            Lookup::Unavailable(reason) => {
                warn!(
                    target: CONSENT_TARGET,
                    user_id,
                    error = %reason,
                    "Cache unavailable, falling back to the store"
                );
            }
        }

        let record = match Lookup::from(self.store.get(user_id).await) {
            Lookup::Found(record) => record,
            Lookup::NotFound => {
                let fresh = ConsentRecord::first_seen(user_id, invocation.locale.as_deref());
                match self.store.create_if_absent(&fresh).await {
                    Ok(stored) => {
                        info!(
                            target: CONSENT_TARGET,
                            user_id,
                            language = %stored.language,
                            "New user registered"
                        );
                        stored
                    }
                    Err(e) => {
                        warn!(
                            target: CONSENT_TARGET,
                            user_id,
                            error = %e,
                            "Failed to register new user"
                        );
                        return Decision::Unavailable;
                    }
                }
            }
            Lookup::Unavailable(reason) => {
                warn!(
                    target: CONSENT_TARGET,
                    user_id,
                    error = %reason,
                    "Store unavailable, cannot check consent"
                );
                return Decision::Unavailable;
            }
        };

        if !record.accepted {
            info!(target: CONSENT_TARGET, user_id, command, "Terms not accepted, command blocked");
            return Decision::Deny(ConsentPrompt::new(user_id, record.language));
        }

        if let Err(e) = self.cache.set(&key, None).await {
            debug!(target: CONSENT_TARGET, user_id, error = %e, "Cache write-through failed");
        }
        Decision::Allow
    }
}
