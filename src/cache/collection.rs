//! The reconciliation engine.
//!
//! A [`CachedCollection`] fronts one entity family with cache-aside reads
//! plus a cardinality-reconciliation protocol for scans: before trusting
//! the cache for a collection read, the authoritative row count from the
//! repository is compared against the number of matching cache keys.
//! Equal counts mean the cache holds exactly the entities currently in
//! the repository for that partition (modulo order) and may be served;
//! any mismatch means the cache is provably wrong (too few, too many, or
//! cold) and the partition is rebuilt before being trusted again.
//!
//! No cross-process lock coordinates concurrent rebuilds; rebuild is
//! idempotent, so concurrent rebuilds converge to the same final state.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::RepoError;

use super::config::CacheConfig;
use super::entity::CacheEntity;
use super::keys::{self, Partition};
use super::store::CacheStore;

/// Source-of-truth access for one entity family.
///
/// `count` must reflect committed rows only. `scan` must be filterable by
/// the same partition dimensions the key scheme uses and apply a stable
/// secondary sort so repeated rebuilds are reproducible.
#[async_trait]
pub trait CollectionRepo<T>: Send + Sync {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError>;

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<T>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError>;
}

/// Cache-aside collection with count-reconciled scans.
///
/// Constructed once at process start and shared by reference; the store
/// and repository are injected rather than reached through globals.
pub struct CachedCollection<T: CacheEntity> {
    store: Arc<dyn CacheStore>,
    repo: Arc<dyn CollectionRepo<T>>,
    config: CacheConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T: CacheEntity> CachedCollection<T> {
    pub fn new(
        store: Arc<dyn CacheStore>,
        repo: Arc<dyn CollectionRepo<T>>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            repo,
            config,
            _marker: PhantomData,
        }
    }

    /// Return all members of the (optionally partition-filtered)
    /// collection, never a stale or incomplete subset.
    ///
    /// The result carries no intrinsic order; callers that need sorted
    /// output sort client-side.
    pub async fn scan(&self, filter: &[Partition]) -> Result<Vec<T>, RepoError> {
        if !self.config.enabled {
            return self.repo.scan(filter).await;
        }

        let pattern = keys::pattern(T::NAMESPACE, filter);
        let (repo_count, cached_keys) = futures::join!(
            self.repo.count(filter),
            self.store.scan_keys(&pattern)
        );
        let repo_count = repo_count?;

        if repo_count == cached_keys.len() as u64 {
            counter!("bancarella_cache_scan_served_total", "namespace" => T::NAMESPACE.prefix())
                .increment(1);
            return Ok(self.serve_from_cache(&cached_keys).await);
        }

        debug!(
            namespace = %T::NAMESPACE,
            pattern,
            repo_count,
            key_count = cached_keys.len(),
            "Cache key count disagrees with repository, rebuilding partition"
        );
        counter!("bancarella_cache_scan_rebuild_total", "namespace" => T::NAMESPACE.prefix())
            .increment(1);
        self.rebuild(filter, cached_keys).await
    }

    async fn serve_from_cache(&self, cached_keys: &[String]) -> Vec<T> {
        let values = self.store.multi_get(cached_keys).await;
        let mut entities = Vec::with_capacity(values.len());
        for (key, value) in cached_keys.iter().zip(values) {
            // An absent slot is a race with concurrent TTL expiry.
            let Some(raw) = value else { continue };
            match serde_json::from_str::<T>(&raw) {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    warn!(key, error = %err, "Discarding malformed cached value");
                }
            }
        }
        entities
    }

    /// Drop the stale key set, refetch the partition from the repository,
    /// repopulate the cache via a pipelined write, and return the fresh
    /// rows. Partial write failure leaves the cache at worst cold for the
    /// unwritten subset; the next scan's count phase detects it.
    async fn rebuild(&self, filter: &[Partition], stale_keys: Vec<String>) -> Result<Vec<T>, RepoError> {
        if !stale_keys.is_empty() {
            self.store.delete_many(&stale_keys).await;
        }
        let rows = self.repo.scan(filter).await?;
        self.batch_add(&rows).await;
        Ok(rows)
    }

    /// Cache-aside point lookup. An absent row is `Ok(None)`, not an
    /// error; callers decide whether that is a 404.
    pub async fn get(&self, id: Uuid, partitions: &[Partition]) -> Result<Option<T>, RepoError> {
        if !self.config.enabled {
            return self.repo.find_by_id(id).await;
        }

        let key = keys::key(T::NAMESPACE, partitions, id);
        if let Some(raw) = self.store.get(&key).await {
            match serde_json::from_str::<T>(&raw) {
                Ok(entity) => {
                    counter!("bancarella_cache_get_hit_total", "namespace" => T::NAMESPACE.prefix())
                        .increment(1);
                    return Ok(Some(entity));
                }
                Err(err) => {
                    warn!(key, error = %err, "Discarding malformed cached value");
                }
            }
        }

        counter!("bancarella_cache_get_miss_total", "namespace" => T::NAMESPACE.prefix())
            .increment(1);
        let Some(row) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        self.add(&row).await;
        Ok(Some(row))
    }

    /// Cache one entity under its current partition values. Called right
    /// after a repository write so the following read is warm.
    pub async fn add(&self, entity: &T) {
        if !self.config.enabled {
            return;
        }
        let key = keys::key(T::NAMESPACE, &entity.partitions(), entity.id());
        match serde_json::to_string(entity) {
            Ok(raw) => {
                self.store
                    .set(&key, &raw, self.config.ttl(T::NAMESPACE))
                    .await;
            }
            Err(err) => {
                warn!(key, error = %err, "Skipping uncacheable entity");
            }
        }
    }

    /// Pipelined [`Self::add`] for rebuilds and bulk seeding.
    pub async fn batch_add(&self, entities: &[T]) {
        if !self.config.enabled || entities.is_empty() {
            return;
        }
        let mut batch = Vec::with_capacity(entities.len());
        for entity in entities {
            let key = keys::key(T::NAMESPACE, &entity.partitions(), entity.id());
            match serde_json::to_string(entity) {
                Ok(raw) => batch.push((key, raw)),
                Err(err) => {
                    warn!(key, error = %err, "Skipping uncacheable entity");
                }
            }
        }
        self.store
            .set_many(&batch, self.config.ttl(T::NAMESPACE))
            .await;
    }

    /// Remove one entity's key. Mutation paths pass the partition values
    /// as they existed before the mutation, otherwise the old key lingers
    /// until TTL expiry.
    pub async fn remove(&self, id: Uuid, partitions: &[Partition]) {
        if !self.config.enabled {
            return;
        }
        let key = keys::key(T::NAMESPACE, partitions, id);
        self.store.delete_many(std::slice::from_ref(&key)).await;
    }

    /// Drop every cached key of the namespace, optionally narrowed to a
    /// partition. Used when an administrator forces a cold cache, e.g.
    /// after a bulk import.
    pub async fn drop_partition(&self, filter: &[Partition]) -> u64 {
        let pattern = keys::pattern(T::NAMESPACE, filter);
        let matched = self.store.scan_keys(&pattern).await;
        if matched.is_empty() {
            return 0;
        }
        let removed = self.store.delete_many(&matched).await;
        debug!(namespace = %T::NAMESPACE, pattern, removed, "Dropped cache partition");
        removed
    }
}
