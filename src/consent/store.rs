//! Durable consent store
//!
//! One row per user in the `users` table (see `schema.sql`). Every write is
//! an upsert keyed on `user_id`, so concurrent first invocations and repeated
//! acceptances are idempotent.

use crate::consent::{ConsentRecord, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

/// Durable source of truth for consent
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Fetch the record for a user
    async fn get(&self, user_id: u64) -> StoreResult<Option<ConsentRecord>>;

    /// Insert the record unless one exists, returning the stored row
    async fn create_if_absent(&self, record: &ConsentRecord) -> StoreResult<ConsentRecord>;

    /// Mark a user as having accepted
    async fn accept(&self, user_id: u64) -> StoreResult<()>;

    /// Trivial round trip used by the health probe
    async fn ping(&self) -> StoreResult<()>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: i64,
    tos_accepted: bool,
    language: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for ConsentRecord {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.user_id.unsigned_abs(),
            accepted: row.tos_accepted,
            language: row.language,
            created_at: row.created_at,
        }
    }
}

fn db_id(user_id: u64) -> StoreResult<i64> {
    i64::try_from(user_id).map_err(|_| StoreError::InvalidId(user_id))
}

/// PostgreSQL-backed consent store
#[derive(Clone)]
pub struct PgConsentStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgConsentStore {
    /// Create a lazily-connected pool.
    ///
    /// The pool does not connect until first use, so the bot starts even when
    /// the database is down; the gate and the store probe surface the outage.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection URL cannot be parsed.
    pub fn connect_lazy(database_url: &str, timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect_lazy(database_url)?;

        info!("Database pool initialized");
        Ok(Self { pool, timeout })
    }
}

#[async_trait]
impl ConsentStore for PgConsentStore {
    async fn get(&self, user_id: u64) -> StoreResult<Option<ConsentRecord>> {
        let query = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, tos_accepted, language, created_at FROM users WHERE user_id = $1",
        )
        .bind(db_id(user_id)?)
        .fetch_optional(&self.pool);

        let row = tokio::time::timeout(self.timeout, query).await??;
        Ok(row.map(ConsentRecord::from))
    }

    async fn create_if_absent(&self, record: &ConsentRecord) -> StoreResult<ConsentRecord> {
        // The no-op update makes RETURNING yield the existing row on conflict,
        // including one committed by a concurrent insert this statement waited on.
        let query = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (user_id, tos_accepted, language, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE SET user_id = users.user_id
             RETURNING user_id, tos_accepted, language, created_at",
        )
        .bind(db_id(record.user_id)?)
        .bind(record.accepted)
        .bind(&record.language)
        .bind(record.created_at)
        .fetch_one(&self.pool);

        let row = tokio::time::timeout(self.timeout, query).await??;
        Ok(row.into())
    }

    async fn accept(&self, user_id: u64) -> StoreResult<()> {
        let query = sqlx::query(
            "INSERT INTO users (user_id, tos_accepted, language, created_at)
             VALUES ($1, TRUE, $2, NOW())
             ON CONFLICT (user_id) DO UPDATE SET tos_accepted = TRUE",
        )
        .bind(db_id(user_id)?)
        .bind(crate::consent::DEFAULT_LANGUAGE)
        .execute(&self.pool);

        tokio::time::timeout(self.timeout, query).await??;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let query = sqlx::query("SELECT 1").execute(&self.pool);
        tokio::time::timeout(self.timeout, query).await??;
        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemoryConsentStore;

#[cfg(test)]
mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-process store with the same upsert semantics as the SQL one
    #[derive(Default)]
    pub struct MemoryConsentStore {
        records: DashMap<u64, ConsentRecord>,
        reads: AtomicUsize,
        inserts: AtomicUsize,
    }

    impl MemoryConsentStore {
        pub fn record(&self, user_id: u64) -> Option<ConsentRecord> {
            self.records.get(&user_id).map(|r| r.value().clone())
        }

        pub fn insert(&self, record: ConsentRecord) {
            self.records.insert(record.user_id, record);
        }

        pub fn len(&self) -> usize {
            self.records.len()
        }

        /// Number of `get` round trips served
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        /// Number of rows actually created
        pub fn inserts(&self) -> usize {
            self.inserts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConsentStore for MemoryConsentStore {
        async fn get(&self, user_id: u64) -> StoreResult<Option<ConsentRecord>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.record(user_id))
        }

        async fn create_if_absent(&self, record: &ConsentRecord) -> StoreResult<ConsentRecord> {
            let entry = self.records.entry(record.user_id).or_insert_with(|| {
                self.inserts.fetch_add(1, Ordering::SeqCst);
                record.clone()
            });
            Ok(entry.value().clone())
        }

        async fn accept(&self, user_id: u64) -> StoreResult<()> {
            self.records
                .entry(user_id)
                .and_modify(|r| r.accepted = true)
                .or_insert_with(|| ConsentRecord {
                    accepted: true,
                    ..ConsentRecord::first_seen(user_id, None)
                });
            Ok(())
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }
}
