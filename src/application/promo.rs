//! Promotional banners on the process-local cache flavor.
//!
//! Promotions are cheap to recompute and not required to be consistent
//! across instances, so they skip the reconciled shared cache entirely:
//! a single-process TTL map holds the active set, and every mutation
//! path clears the whole map unconditionally.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::cache::LocalTtlCache;
use crate::domain::entities::PromoBannerRecord;

use super::repos::{PromoRepo, RepoError, UpsertPromoBannerParams};

const ACTIVE_PROMOS_KEY: &str = "active";

pub struct PromoService<R: PromoRepo> {
    repo: Arc<R>,
    cache: Arc<LocalTtlCache<Vec<PromoBannerRecord>>>,
}

impl<R: PromoRepo> PromoService<R> {
    pub fn new(repo: Arc<R>, ttl: Duration) -> Self {
        Self {
            repo,
            cache: Arc::new(LocalTtlCache::new(Some(ttl))),
        }
    }

    /// Start the proactive expiry sweep for this service's cache.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        self.cache.spawn_sweeper(every)
    }

    /// Currently running promotions, cached for the configured TTL.
    pub async fn active_promos(&self) -> Result<Vec<PromoBannerRecord>, RepoError> {
        if let Some(promos) = self.cache.get(ACTIVE_PROMOS_KEY) {
            return Ok(promos);
        }
        let promos = self.repo.list_active_promos().await?;
        self.cache.set(ACTIVE_PROMOS_KEY, promos.clone(), None);
        Ok(promos)
    }

    pub async fn upsert(
        &self,
        params: UpsertPromoBannerParams,
    ) -> Result<PromoBannerRecord, RepoError> {
        let promo = self.repo.upsert_promo(params).await?;
        self.cache.clear();
        Ok(promo)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.repo.delete_promo(id).await?;
        self.cache.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;

    struct StubPromoRepo {
        promos: std::sync::RwLock<Vec<PromoBannerRecord>>,
        list_calls: AtomicUsize,
    }

    impl StubPromoRepo {
        fn new() -> Self {
            Self {
                promos: std::sync::RwLock::new(Vec::new()),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    fn sample_promo(headline: &str) -> PromoBannerRecord {
        let now = OffsetDateTime::now_utc();
        PromoBannerRecord {
            id: Uuid::new_v4(),
            headline: headline.to_string(),
            body: "".to_string(),
            starts_at: now,
            ends_at: now + time::Duration::days(7),
            created_at: now,
            updated_at: now,
        }
    }

    #[async_trait]
    impl PromoRepo for StubPromoRepo {
        async fn list_active_promos(&self) -> Result<Vec<PromoBannerRecord>, RepoError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.promos.read().expect("promos lock").clone())
        }

        async fn upsert_promo(
            &self,
            params: UpsertPromoBannerParams,
        ) -> Result<PromoBannerRecord, RepoError> {
            let mut promo = sample_promo(&params.headline);
            if let Some(id) = params.id {
                promo.id = id;
            }
            let mut guard = self.promos.write().expect("promos lock");
            guard.retain(|p| p.id != promo.id);
            guard.push(promo.clone());
            Ok(promo)
        }

        async fn delete_promo(&self, id: Uuid) -> Result<(), RepoError> {
            self.promos
                .write()
                .expect("promos lock")
                .retain(|p| p.id != id);
            Ok(())
        }
    }

    fn upsert_params(headline: &str) -> UpsertPromoBannerParams {
        let now = OffsetDateTime::now_utc();
        UpsertPromoBannerParams {
            id: None,
            headline: headline.to_string(),
            body: "".to_string(),
            starts_at: now,
            ends_at: now + time::Duration::days(7),
        }
    }

    #[tokio::test]
    async fn active_promos_are_served_from_cache() {
        let repo = Arc::new(StubPromoRepo::new());
        let service = PromoService::new(Arc::clone(&repo), Duration::from_secs(300));

        service.upsert(upsert_params("launch")).await.expect("upsert");

        let first = service.active_promos().await.expect("first read");
        let second = service.active_promos().await.expect("second read");
        assert_eq!(first, second);
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_mutation_clears_the_cache() {
        let repo = Arc::new(StubPromoRepo::new());
        let service = PromoService::new(Arc::clone(&repo), Duration::from_secs(300));

        let promo = service.upsert(upsert_params("spring")).await.expect("upsert");
        assert_eq!(service.active_promos().await.expect("read").len(), 1);

        service.delete(promo.id).await.expect("delete");
        assert!(service.active_promos().await.expect("read").is_empty());
        // One list per cache fill: mutations dropped the cached set both times.
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }
}
