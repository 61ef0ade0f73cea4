//! Terms of Service consent
//!
//! Every command passes through [`ConsentGate`] before it runs. Acceptance is
//! stored durably by [`ConsentStore`] and shadowed in a [`KeyValueCache`] so
//! known acceptors never touch the database. The same cache backs the
//! [`CooldownDebouncer`].

mod accept;
mod cache;
mod debounce;
mod error;
mod gate;
mod lookup;
mod prompt;
mod record;
mod store;

pub use accept::{AcceptanceFlow, Confirmation};
pub use cache::{KeyValueCache, MemoryCache, RedisCache};
pub use debounce::{CooldownDebouncer, DEFAULT_DEBOUNCE};
pub use error::{CacheError, CacheResult, ConsentError, ConsentResult, StoreError, StoreResult};
pub use gate::{ConsentGate, Decision, Invocation};
pub use lookup::Lookup;
pub use prompt::{
    AcceptButton, ConsentPrompt, Texts, confirmation_message, private_confirmation_message,
    record_failed_message, texts, unavailable_reply,
};
pub use record::{ConsentRecord, DEFAULT_LANGUAGE, cooldown_key, language_from_locale, tos_key};
pub use store::{ConsentStore, PgConsentStore};

#[cfg(test)]
pub use cache::MockKeyValueCache;
#[cfg(test)]
pub use store::{MemoryConsentStore, MockConsentStore};
