//! End-to-end behavior of the count-reconciled cache over an in-memory
//! store and repository double.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use bancarella::application::BannerService;
use bancarella::application::repos::{
    BannerWriteRepo, CreateBannerParams, RepoError, UpdateBannerParams,
};
use bancarella::cache::{
    CacheConfig, CacheEntity, CacheStore, CachedCollection, CollectionRepo, MemoryStore, Partition,
};
use bancarella::domain::entities::BannerRecord;
use bancarella::domain::types::BannerLocation;

#[derive(Default)]
struct MemBannerRepo {
    rows: Mutex<Vec<BannerRecord>>,
    count_calls: AtomicUsize,
    scan_calls: AtomicUsize,
    find_calls: AtomicUsize,
}

impl MemBannerRepo {
    fn seed(rows: Vec<BannerRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    fn rows(&self) -> Vec<BannerRecord> {
        self.rows.lock().expect("rows lock").clone()
    }

    fn remove_row(&self, id: Uuid) {
        self.rows.lock().expect("rows lock").retain(|b| b.id != id);
    }

    fn matches(banner: &BannerRecord, filter: &[Partition]) -> bool {
        filter
            .iter()
            .all(|p| p.dimension() != "location" || banner.location.as_str() == p.value())
    }
}

#[async_trait]
impl CollectionRepo<BannerRecord> for MemBannerRepo {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().expect("rows lock");
        Ok(rows.iter().filter(|b| Self::matches(b, filter)).count() as u64)
    }

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<BannerRecord>, RepoError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().expect("rows lock");
        Ok(rows
            .iter()
            .filter(|b| Self::matches(b, filter))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BannerRecord>, RepoError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().expect("rows lock");
        Ok(rows.iter().find(|b| b.id == id).cloned())
    }
}

#[async_trait]
impl BannerWriteRepo for MemBannerRepo {
    async fn create_banner(&self, params: CreateBannerParams) -> Result<BannerRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let banner = BannerRecord {
            id: Uuid::new_v4(),
            location: params.location,
            title: params.title,
            image_url: params.image_url,
            target_url: params.target_url,
            active: params.active,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().expect("rows lock").push(banner.clone());
        Ok(banner)
    }

    async fn update_banner(&self, params: UpdateBannerParams) -> Result<BannerRecord, RepoError> {
        let mut rows = self.rows.lock().expect("rows lock");
        let banner = rows
            .iter_mut()
            .find(|b| b.id == params.id)
            .ok_or(RepoError::NotFound)?;
        banner.location = params.location;
        banner.title = params.title;
        banner.image_url = params.image_url;
        banner.target_url = params.target_url;
        banner.active = params.active;
        banner.updated_at = OffsetDateTime::now_utc();
        Ok(banner.clone())
    }

    async fn delete_banner(&self, id: Uuid) -> Result<(), RepoError> {
        let mut rows = self.rows.lock().expect("rows lock");
        let before = rows.len();
        rows.retain(|b| b.id != id);
        if rows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Store double that is permanently unreachable; every operation behaves
/// like a degraded Redis connection.
struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn multi_get(&self, keys: &[String]) -> Vec<Option<String>> {
        vec![None; keys.len()]
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) {}

    async fn set_many(&self, _entries: &[(String, String)], _ttl: Duration) {}

    async fn delete_many(&self, _keys: &[String]) -> u64 {
        0
    }

    async fn scan_keys(&self, _pattern: &str) -> Vec<String> {
        Vec::new()
    }
}

fn banner(location: BannerLocation, title: &str) -> BannerRecord {
    let now = OffsetDateTime::now_utc();
    BannerRecord {
        id: Uuid::new_v4(),
        location,
        title: title.to_string(),
        image_url: format!("https://cdn.example/{title}.webp"),
        target_url: None,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

fn ids(banners: &[BannerRecord]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = banners.iter().map(|b| b.id).collect();
    out.sort();
    out
}

fn collection(
    repo: &Arc<MemBannerRepo>,
    store: &Arc<MemoryStore>,
) -> CachedCollection<BannerRecord> {
    CachedCollection::new(
        Arc::clone(store) as Arc<dyn CacheStore>,
        Arc::clone(repo) as Arc<dyn CollectionRepo<BannerRecord>>,
        CacheConfig::default(),
    )
}

#[tokio::test]
async fn cold_scan_rebuilds_then_serves_from_cache() {
    let repo = Arc::new(MemBannerRepo::seed(vec![
        banner(BannerLocation::Home, "spring"),
        banner(BannerLocation::Home, "summer"),
        banner(BannerLocation::Checkout, "upsell"),
    ]));
    let store = Arc::new(MemoryStore::new());
    let cache = collection(&repo, &store);
    let home = [BannerRecord::location_partition(BannerLocation::Home)];

    // Cold cache: counts disagree (2 vs 0), so the partition is rebuilt.
    let first = cache.scan(&home).await.expect("cold scan");
    assert_eq!(first.len(), 2);
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), 1);

    // Warm cache: counts agree and the repository is not scanned again.
    let second = cache.scan(&home).await.expect("warm scan");
    assert_eq!(ids(&second), ids(&first));
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), 1);
    assert_eq!(repo.count_calls.load(Ordering::SeqCst), 2);

    // The checkout partition was never populated by the home scan.
    let checkout = [BannerRecord::location_partition(BannerLocation::Checkout)];
    let third = cache.scan(&checkout).await.expect("checkout scan");
    assert_eq!(third.len(), 1);
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scan_self_heals_after_unseen_repository_delete() {
    let a = banner(BannerLocation::Home, "a");
    let b = banner(BannerLocation::Home, "b");
    let repo = Arc::new(MemBannerRepo::seed(vec![a.clone(), b.clone()]));
    let store = Arc::new(MemoryStore::new());
    let cache = collection(&repo, &store);
    let home = [BannerRecord::location_partition(BannerLocation::Home)];

    assert_eq!(cache.scan(&home).await.expect("warm up").len(), 2);

    // A delete that bypassed invalidation leaves one stale key behind.
    repo.remove_row(b.id);

    let healed = cache.scan(&home).await.expect("healing scan");
    assert_eq!(ids(&healed), vec![a.id]);

    // The stale key is gone; the next scan is served from the cache.
    let scans_before = repo.scan_calls.load(Ordering::SeqCst);
    let warm = cache.scan(&home).await.expect("warm scan");
    assert_eq!(warm.len(), 1);
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), scans_before);
}

#[tokio::test]
async fn extra_stale_key_forces_rebuild_and_is_purged() {
    let repo = Arc::new(MemBannerRepo::seed(vec![banner(
        BannerLocation::Home,
        "only",
    )]));
    let store = Arc::new(MemoryStore::new());
    let cache = collection(&repo, &store);
    let home = [BannerRecord::location_partition(BannerLocation::Home)];

    cache.scan(&home).await.expect("warm up");

    // A leftover key from a deleted banner: one row, two keys.
    let ghost = format!("banner:location=home:{}", Uuid::new_v4());
    store.set(&ghost, "{}", Duration::from_secs(300)).await;

    let rows = cache.scan(&home).await.expect("rebuild scan");
    assert_eq!(rows.len(), 1);
    assert!(store.get(&ghost).await.is_none());
}

#[tokio::test]
async fn concurrent_scans_converge() {
    let repo = Arc::new(MemBannerRepo::seed(vec![
        banner(BannerLocation::Home, "a"),
        banner(BannerLocation::Home, "b"),
        banner(BannerLocation::Home, "c"),
    ]));
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(collection(&repo, &store));
    let home = [BannerRecord::location_partition(BannerLocation::Home)];

    let (left, right) = futures::join!(cache.scan(&home), cache.scan(&home));
    let left = left.expect("left scan");
    let right = right.expect("right scan");
    assert_eq!(ids(&left), ids(&right));
    assert_eq!(left.len(), 3);

    // Whatever interleaving happened, the cache converged to the full set.
    let scans_before = repo.scan_calls.load(Ordering::SeqCst);
    let settled = cache.scan(&home).await.expect("settled scan");
    assert_eq!(settled.len(), 3);
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), scans_before);
}

#[tokio::test]
async fn point_read_populates_cache_on_miss() {
    let row = banner(BannerLocation::Home, "single");
    let repo = Arc::new(MemBannerRepo::seed(vec![row.clone()]));
    let store = Arc::new(MemoryStore::new());
    let cache = collection(&repo, &store);
    let partitions = row.partitions();

    let first = cache.get(row.id, &partitions).await.expect("first get");
    assert_eq!(first.as_ref().map(|b| b.id), Some(row.id));
    assert_eq!(repo.find_calls.load(Ordering::SeqCst), 1);

    let second = cache.get(row.id, &partitions).await.expect("second get");
    assert_eq!(second.as_ref().map(|b| b.id), Some(row.id));
    assert_eq!(repo.find_calls.load(Ordering::SeqCst), 1);

    // An id the repository does not know is a plain None.
    let absent = cache.get(Uuid::new_v4(), &partitions).await.expect("absent");
    assert!(absent.is_none());
}

#[tokio::test]
async fn malformed_cached_value_is_dropped_not_fatal() {
    let a = banner(BannerLocation::Home, "good");
    let b = banner(BannerLocation::Home, "corrupt");
    let repo = Arc::new(MemBannerRepo::seed(vec![a.clone(), b.clone()]));
    let store = Arc::new(MemoryStore::new());
    let cache = collection(&repo, &store);
    let home = [BannerRecord::location_partition(BannerLocation::Home)];

    cache.scan(&home).await.expect("warm up");

    let key = format!("banner:location=home:{}", b.id);
    store.set(&key, "not json", Duration::from_secs(300)).await;

    // Counts still agree, so the scan is served; the bad slot is dropped.
    let rows = cache.scan(&home).await.expect("served scan");
    assert_eq!(ids(&rows), vec![a.id]);
}

#[tokio::test]
async fn unreachable_store_degrades_to_repository_reads() {
    let row = banner(BannerLocation::Home, "fallback");
    let repo = Arc::new(MemBannerRepo::seed(vec![row.clone()]));
    let cache = CachedCollection::new(
        Arc::new(UnreachableStore) as Arc<dyn CacheStore>,
        Arc::clone(&repo) as Arc<dyn CollectionRepo<BannerRecord>>,
        CacheConfig::default(),
    );
    let home = [BannerRecord::location_partition(BannerLocation::Home)];

    for _ in 0..2 {
        let rows = cache.scan(&home).await.expect("degraded scan");
        assert_eq!(rows.len(), 1);
        let got = cache.get(row.id, &row.partitions()).await.expect("get");
        assert!(got.is_some());
    }
    // Every read fell through to the repository, none failed.
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), 2);
    assert_eq!(repo.find_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn disabled_cache_routes_reads_to_repository() {
    let repo = Arc::new(MemBannerRepo::seed(vec![banner(
        BannerLocation::Home,
        "uncached",
    )]));
    let store = Arc::new(MemoryStore::new());
    let config = CacheConfig {
        enabled: false,
        ..Default::default()
    };
    let cache = CachedCollection::new(
        Arc::clone(&store) as Arc<dyn CacheStore>,
        Arc::clone(&repo) as Arc<dyn CollectionRepo<BannerRecord>>,
        config,
    );

    let rows = cache.scan(&[]).await.expect("scan");
    assert_eq!(rows.len(), 1);
    assert!(store.scan_keys("banner:*").await.is_empty());
}

#[tokio::test]
async fn moving_a_banner_between_locations_invalidates_the_old_partition() {
    let repo = Arc::new(MemBannerRepo::default());
    let store = Arc::new(MemoryStore::new());
    let service = BannerService::new(
        Arc::clone(&repo),
        Arc::clone(&store) as Arc<dyn CacheStore>,
        CacheConfig::default(),
    );

    let created = service
        .create(CreateBannerParams {
            location: BannerLocation::Home,
            title: "movable".into(),
            image_url: "https://cdn.example/movable.webp".into(),
            target_url: None,
            active: true,
        })
        .await
        .expect("create");

    assert_eq!(
        service
            .list_by_location(BannerLocation::Home)
            .await
            .expect("home list")
            .len(),
        1
    );

    service
        .update(UpdateBannerParams {
            id: created.id,
            location: BannerLocation::Checkout,
            title: "movable".into(),
            image_url: "https://cdn.example/movable.webp".into(),
            target_url: None,
            active: true,
        })
        .await
        .expect("move to checkout");

    // The old partition's key is removed synchronously, not left to TTL.
    let old_key = format!("banner:location=home:{}", created.id);
    assert!(store.get(&old_key).await.is_none());

    assert!(
        service
            .list_by_location(BannerLocation::Home)
            .await
            .expect("home list")
            .is_empty()
    );
    let checkout = service
        .list_by_location(BannerLocation::Checkout)
        .await
        .expect("checkout list");
    assert_eq!(checkout.len(), 1);
    assert_eq!(checkout[0].location, BannerLocation::Checkout);
}

#[tokio::test]
async fn deleting_a_banner_removes_its_key() {
    let repo = Arc::new(MemBannerRepo::default());
    let store = Arc::new(MemoryStore::new());
    let service = BannerService::new(
        Arc::clone(&repo),
        Arc::clone(&store) as Arc<dyn CacheStore>,
        CacheConfig::default(),
    );

    let created = service
        .create(CreateBannerParams {
            location: BannerLocation::Home,
            title: "short lived".into(),
            image_url: "https://cdn.example/short.webp".into(),
            target_url: None,
            active: true,
        })
        .await
        .expect("create");

    service.delete(created.id).await.expect("delete");

    assert!(store.scan_keys("banner:*").await.is_empty());
    assert!(repo.rows().is_empty());
    assert!(
        service
            .list_by_location(BannerLocation::Home)
            .await
            .expect("home list")
            .is_empty()
    );
}

#[tokio::test]
async fn drop_cache_forces_the_next_scan_cold() {
    let repo = Arc::new(MemBannerRepo::seed(vec![
        banner(BannerLocation::Home, "a"),
        banner(BannerLocation::Checkout, "b"),
    ]));
    let store = Arc::new(MemoryStore::new());
    let service = BannerService::new(
        Arc::clone(&repo),
        Arc::clone(&store) as Arc<dyn CacheStore>,
        CacheConfig::default(),
    );

    service.list_all().await.expect("warm up");
    assert_eq!(store.scan_keys("banner:*").await.len(), 2);

    let dropped = service.drop_cache(Some(BannerLocation::Home)).await;
    assert_eq!(dropped, 1);
    assert_eq!(store.scan_keys("banner:*").await.len(), 1);

    let dropped = service.drop_cache(None).await;
    assert_eq!(dropped, 1);
    assert!(store.scan_keys("banner:*").await.is_empty());

    let scans_before = repo.scan_calls.load(Ordering::SeqCst);
    assert_eq!(service.list_all().await.expect("cold list").len(), 2);
    assert_eq!(repo.scan_calls.load(Ordering::SeqCst), scans_before + 1);
}
