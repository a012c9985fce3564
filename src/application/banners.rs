//! Banner read/mutation paths.
//!
//! The service owns the repository/cache pair and is the only mutation
//! surface for banners. Invalidation runs synchronously in the same
//! request, after the repository write and before responding; there is
//! no asynchronous invalidation channel.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{CacheConfig, CacheEntity, CacheStore, CachedCollection, CollectionRepo};
use crate::domain::entities::BannerRecord;
use crate::domain::types::BannerLocation;

use super::repos::{BannerWriteRepo, CreateBannerParams, RepoError, UpdateBannerParams};

pub struct BannerService<R>
where
    R: CollectionRepo<BannerRecord> + BannerWriteRepo + 'static,
{
    repo: Arc<R>,
    cache: Arc<CachedCollection<BannerRecord>>,
}

impl<R> BannerService<R>
where
    R: CollectionRepo<BannerRecord> + BannerWriteRepo + 'static,
{
    pub fn new(repo: Arc<R>, store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        let cache = Arc::new(CachedCollection::new(
            store,
            repo.clone() as Arc<dyn CollectionRepo<BannerRecord>>,
            config,
        ));
        Self { repo, cache }
    }

    /// Handle for cache warming.
    pub fn collection(&self) -> Arc<CachedCollection<BannerRecord>> {
        Arc::clone(&self.cache)
    }

    /// Banners for one display location, most recent first.
    pub async fn list_by_location(
        &self,
        location: BannerLocation,
    ) -> Result<Vec<BannerRecord>, RepoError> {
        let filter = [BannerRecord::location_partition(location)];
        let mut banners = self.cache.scan(&filter).await?;
        banners.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(banners)
    }

    pub async fn list_all(&self) -> Result<Vec<BannerRecord>, RepoError> {
        let mut banners = self.cache.scan(&[]).await?;
        banners.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(banners)
    }

    pub async fn get(
        &self,
        id: Uuid,
        location: BannerLocation,
    ) -> Result<Option<BannerRecord>, RepoError> {
        self.cache
            .get(id, &[BannerRecord::location_partition(location)])
            .await
    }

    pub async fn create(&self, params: CreateBannerParams) -> Result<BannerRecord, RepoError> {
        let banner = self.repo.create_banner(params).await?;
        self.cache.add(&banner).await;
        Ok(banner)
    }

    /// Update a banner. When the location changes, the key under the old
    /// partition is removed explicitly so the old partition's scan stops
    /// returning the banner immediately instead of after TTL expiry.
    pub async fn update(&self, params: UpdateBannerParams) -> Result<BannerRecord, RepoError> {
        let before = self
            .repo
            .find_by_id(params.id)
            .await?
            .ok_or(RepoError::NotFound)?;

        let updated = self.repo.update_banner(params).await?;

        if before.location != updated.location {
            self.cache.remove(before.id, &before.partitions()).await;
        }
        self.cache.add(&updated).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let before = self.repo.find_by_id(id).await?.ok_or(RepoError::NotFound)?;
        self.repo.delete_banner(id).await?;
        self.cache.remove(id, &before.partitions()).await;
        Ok(())
    }

    /// Force a cold cache for one location, or for every banner.
    pub async fn drop_cache(&self, location: Option<BannerLocation>) -> u64 {
        let filter: Vec<_> = location
            .map(|loc| vec![BannerRecord::location_partition(loc)])
            .unwrap_or_default();
        self.cache.drop_partition(&filter).await
    }
}
