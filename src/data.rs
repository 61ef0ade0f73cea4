use std::{fmt, ops::Deref, sync::Arc, time::Instant};

use crate::config::Config;
use crate::consent::{
    AcceptanceFlow, ConsentGate, ConsentStore, CooldownDebouncer, KeyValueCache,
};
use crate::health::GatewayState;

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("prefix", &self.config.prefix)
            .field("owners", &self.config.owner_ids)
            .field("gateway_connected", &self.gateway.is_connected())
            .field("debounce_window", &self.debouncer.window())
            .finish_non_exhaustive()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Wire the consent components around one store and one cache
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn ConsentStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        Self(Arc::new(DataInner::new(config, store, cache)))
    }
}

/// Shared handles, created once at startup
pub struct DataInner {
    pub config: Config,
    pub store: Arc<dyn ConsentStore>,
    pub cache: Arc<dyn KeyValueCache>,
    pub gateway: GatewayState,
    pub gate: ConsentGate,
    pub acceptance: AcceptanceFlow,
    pub debouncer: CooldownDebouncer,
    pub start_time: Instant,
}

impl DataInner {
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn ConsentStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        let gate = ConsentGate::new(store.clone(), cache.clone(), config.owners());
        let acceptance = AcceptanceFlow::new(store.clone(), cache.clone());
        let debouncer = CooldownDebouncer::new(cache.clone(), config.debounce_window());

        Self {
            config,
            store,
            cache,
            gateway: GatewayState::new(),
            gate,
            acceptance,
            debouncer,
            start_time: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::{Decision, Invocation, MemoryCache, MemoryConsentStore};
    use std::time::Duration;

    fn data_with_owner(owner: u64) -> (Data, Arc<MemoryConsentStore>) {
        let store = Arc::new(MemoryConsentStore::default());
        let config = Config {
            owner_ids: vec![owner],
            cooldown_debounce_secs: 30,
            ..Config::default()
        };
        let data = Data::new(config, store.clone(), Arc::new(MemoryCache::new()));
        (data, store)
    }

    #[test]
    fn test_data_new() {
        let (data, store) = data_with_owner(1);
        assert_eq!(data.config.prefix, ";");
        assert_eq!(data.debouncer.window(), Duration::from_secs(30));
        assert!(!data.gateway.is_connected());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_data_debug_impl() {
        let (data, _) = data_with_owner(1);
        let debug_output = format!("{data:?}");
        assert!(debug_output.contains("Data"));
        assert!(debug_output.contains("prefix"));
        assert!(debug_output.contains("gateway_connected"));
    }

    #[tokio::test]
    async fn test_gate_uses_configured_owners() {
        let (data, store) = data_with_owner(7);

        let owner = data.gate.authorize(&Invocation::new(7, "ping", None)).await;
        assert_eq!(owner, Decision::Allow);
        assert_eq!(store.len(), 0);

        let other = data.gate.authorize(&Invocation::new(8, "ping", None)).await;
        assert!(matches!(other, Decision::Deny(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_components_share_store_and_cache() {
        let (data, _) = data_with_owner(1);
        let invocation = Invocation::new(42, "ping", Some("fr-FR"));

        assert!(matches!(data.gate.authorize(&invocation).await, Decision::Deny(_)));
        data.acceptance.on_accept(42).await.unwrap();
        assert_eq!(data.gate.authorize(&invocation).await, Decision::Allow);
    }
}
