//! Cache storage backends.
//!
//! [`CacheStore`] is a thin, failure-tolerant wrapper over a key-value
//! store. There are no transactions and no atomic multi-key writes;
//! batched operations are best-effort pipelines. When the store is
//! unreachable or slow, every operation degrades to "no cache data
//! available" rather than raising: the repository is always authoritative
//! and available as fallback, so an unreachable cache is a guaranteed
//! miss, never an error that blocks the read path.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use metrics::counter;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

use crate::infra::error::InfraError;

use super::keys::glob_match;

/// Thin abstraction over a networked key-value store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    /// Fetch many values; result slots line up with the input keys.
    async fn multi_get(&self, keys: &[String]) -> Vec<Option<String>>;

    /// Overwrite semantics; the TTL resets on every set.
    async fn set(&self, key: &str, value: &str, ttl: Duration);

    /// Pipelined batch write. Partial success leaves the cache at worst
    /// cold for the unwritten subset, which the next scan's count phase
    /// detects.
    async fn set_many(&self, entries: &[(String, String)], ttl: Duration);

    async fn delete_many(&self, keys: &[String]) -> u64;

    /// Complete, de-duplicated key set matching a glob pattern. Cursors
    /// are iterated to exhaustion.
    async fn scan_keys(&self, pattern: &str) -> Vec<String>;
}

// ============================================================================
// Redis store
// ============================================================================

const SCAN_BATCH: usize = 200;

#[derive(Debug, thiserror::Error)]
enum StoreOpError {
    #[error("connection pool: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Redis-backed [`CacheStore`] with a per-operation timeout distinct from
/// the database's.
pub struct RedisStore {
    pool: Pool,
    op_timeout: Duration,
}

impl RedisStore {
    pub fn new(pool: Pool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Build a store from a Redis URL.
    pub fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, InfraError> {
        let pool = RedisConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| InfraError::cache_store(err.to_string()))?;
        Ok(Self::new(pool, op_timeout))
    }

    fn degraded(op: &'static str, detail: &str) {
        counter!("bancarella_cache_store_degraded_total", "op" => op).increment(1);
        warn!(op, detail, "Cache store unavailable, treating as miss");
    }

    /// Run one store operation under the cache timeout; any failure
    /// collapses to `None`.
    async fn run<T, F>(&self, op: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, StoreOpError>> + Send,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                Self::degraded(op, &err.to_string());
                None
            }
            Err(_) => {
                Self::degraded(op, "operation timed out");
                None
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Option<String> {
        let pool = self.pool.clone();
        self.run("get", async move {
            let mut conn = pool.get().await?;
            Ok(conn.get::<_, Option<String>>(key).await?)
        })
        .await
        .flatten()
    }

    async fn multi_get(&self, keys: &[String]) -> Vec<Option<String>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let pool = self.pool.clone();
        self.run("multi_get", async move {
            let mut conn = pool.get().await?;
            Ok(conn.mget::<_, Vec<Option<String>>>(keys).await?)
        })
        .await
        .unwrap_or_else(|| vec![None; keys.len()])
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let pool = self.pool.clone();
        let seconds = ttl.as_secs().max(1);
        self.run("set", async move {
            let mut conn = pool.get().await?;
            conn.set_ex::<_, _, ()>(key, value, seconds).await?;
            Ok(())
        })
        .await;
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) {
        if entries.is_empty() {
            return;
        }
        let pool = self.pool.clone();
        let seconds = ttl.as_secs().max(1);
        self.run("set_many", async move {
            let mut conn = pool.get().await?;
            let mut pipe = redis::pipe();
            for (key, value) in entries {
                pipe.set_ex(key, value, seconds).ignore();
            }
            pipe.query_async::<()>(&mut conn).await?;
            Ok(())
        })
        .await;
    }

    async fn delete_many(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }
        let pool = self.pool.clone();
        self.run("delete_many", async move {
            let mut conn = pool.get().await?;
            Ok(conn.del::<_, u64>(keys).await?)
        })
        .await
        .unwrap_or(0)
    }

    async fn scan_keys(&self, pattern: &str) -> Vec<String> {
        let pool = self.pool.clone();
        self.run("scan_keys", async move {
            let mut conn = pool.get().await?;
            let mut keys = Vec::new();
            let mut seen = std::collections::HashSet::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;
                for key in batch {
                    if seen.insert(key.clone()) {
                        keys.push(key);
                    }
                }
                cursor = next;
                if cursor == 0 {
                    break;
                }
            }
            Ok(keys)
        })
        .await
        .unwrap_or_default()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process [`CacheStore`] with the same TTL and glob semantics as the
/// Redis store. Used by tests and single-node deployments.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        match guard.get(key) {
            Some(entry) if entry.is_expired(now) => {
                guard.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    async fn multi_get(&self, keys: &[String]) -> Vec<Option<String>> {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        keys.iter()
            .map(|key| match guard.get(key) {
                Some(entry) if entry.is_expired(now) => {
                    guard.remove(key);
                    None
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            })
            .collect()
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) {
        let expires_at = Some(Instant::now() + ttl);
        let mut guard = self.entries.write().await;
        for (key, value) in entries {
            guard.insert(
                key.clone(),
                MemoryEntry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }
    }

    async fn delete_many(&self, keys: &[String]) -> u64 {
        let mut guard = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if guard.remove(key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    async fn scan_keys(&self, pattern: &str) -> Vec<String> {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            guard.remove(&key);
        }
        guard
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect()
    }
}
