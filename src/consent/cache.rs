//! Volatile key/value cache
//!
//! The cache only answers "does this key exist". It shadows durable state and
//! may lose entries at any time without affecting correctness.

use crate::consent::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Sentinel stored under every key
const PRESENT: &str = "1";

/// Writes between sweeps of expired in-process entries
const SWEEP_EVERY: usize = 64;

/// Existence-only key/value cache with optional per-key expiry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Whether a live entry exists for `key`
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Store a presence marker, expiring after `ttl` if given
    async fn set(&self, key: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Store an expiring marker unless a live one exists.
    ///
    /// Returns `true` when this call created the marker. The check and the
    /// write are a single atomic step.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Trivial round trip used by the health probe
    async fn ping(&self) -> CacheResult<()>;
}

/// Redis-backed cache sharing one auto-reconnecting connection
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisCache {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(redis_url: &str, timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client)).await??;

        info!("Cache initialized");
        Ok(Self { conn, timeout })
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let found: bool = tokio::time::timeout(self.timeout, conn.exists(key)).await??;
        Ok(found)
    }

    async fn set(&self, key: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                let _: () =
                    tokio::time::timeout(self.timeout, conn.set_ex(key, PRESENT, seconds))
                        .await??;
            }
            None => {
                let _: () =
                    tokio::time::timeout(self.timeout, conn.set(key, PRESENT)).await??;
            }
        }
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        // SET NX replies nil when the key already exists
        let reply: Option<String> = tokio::time::timeout(
            self.timeout,
            redis::cmd("SET")
                .arg(key)
                .arg(PRESENT)
                .arg("NX")
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async(&mut conn),
        )
        .await??;
        Ok(reply.is_some())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String =
            tokio::time::timeout(self.timeout, redis::cmd("PING").query_async(&mut conn))
                .await??;
        Ok(())
    }
}

/// In-process cache used when no Redis URL is configured.
///
/// Expired entries are dropped when their key is looked up, and every
/// `SWEEP_EVERY` writes a sweep drops the rest.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Option<Instant>>,
    writes: AtomicUsize,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(&self, key: &str, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.value().is_none_or(|expires_at| expires_at > now))
    }

    /// Count a write and sweep expired entries once enough have accumulated.
    /// Must not be called while holding a reference into `entries`.
    fn note_write(&self, now: Instant) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY == 0 {
            self.entries
                .retain(|_, expires_at| expires_at.is_none_or(|at| at > now));
        }
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let live = self.is_live(key, now);
        if !live {
            self.entries
                .remove_if(key, |_, expires_at| expires_at.is_some_and(|at| at <= now));
        }
        Ok(live)
    }

    async fn set(&self, key: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        self.entries.insert(key.to_string(), ttl.map(|ttl| now + ttl));
        self.note_write(now);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let created = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let expired = entry.get().is_some_and(|at| at <= now);
                if expired {
                    entry.insert(Some(now + ttl));
                }
                expired
            }
            Entry::Vacant(entry) => {
                entry.insert(Some(now + ttl));
                true
            }
        };

        if created {
            self.note_write(now);
        }
        Ok(created)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}
