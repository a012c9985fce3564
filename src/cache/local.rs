//! Process-local TTL cache.
//!
//! The simplified flavor for content that is cheap to recompute and not
//! required to be consistent across instances (promotional banners).
//! There is no count-reconciliation step; instead every mutation path
//! calls [`LocalTtlCache::clear`] unconditionally, trading precision for
//! simplicity. Expired entries are evicted lazily on read and proactively
//! by a periodic sweep.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

struct LocalEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Option<Duration>,
}

impl<V> LocalEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.ttl.is_some_and(|ttl| now - self.stored_at > ttl)
    }
}

/// Single-process TTL-expiring map cache.
pub struct LocalTtlCache<V> {
    entries: RwLock<HashMap<String, LocalEntry<V>>>,
    default_ttl: Option<Duration>,
}

fn write_guard<'a, V>(
    lock: &'a RwLock<HashMap<String, LocalEntry<V>>>,
    op: &'static str,
) -> RwLockWriteGuard<'a, HashMap<String, LocalEntry<V>>> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(op, "Recovered from poisoned local cache lock");
            poisoned.into_inner()
        }
    }
}

impl<V: Clone + Send + Sync + 'static> LocalTtlCache<V> {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Store a value; `ttl` falls back to the cache-wide default, and
    /// `None` for both means the entry never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let entry = LocalEntry {
            value,
            stored_at: Instant::now(),
            ttl: ttl.or(self.default_ttl),
        };
        write_guard(&self.entries, "set").insert(key.into(), entry);
    }

    /// Fetch a value, lazily evicting it when expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = write_guard(&self.entries, "get");
        match guard.get(key) {
            Some(entry) if entry.is_expired(now) => {
                guard.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Drop everything. Mutation paths call this unconditionally.
    pub fn clear(&self) {
        write_guard(&self.entries, "clear").clear();
    }

    /// Evict every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut guard = write_guard(&self.entries, "sweep");
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - guard.len();
        if evicted > 0 {
            counter!("bancarella_cache_local_evicted_total").increment(evicted as u64);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        write_guard(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the periodic sweep. The task exits once the cache is
    /// dropped; it runs on a fixed interval independent of request
    /// traffic.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else { break };
                let evicted = cache.sweep();
                if evicted > 0 {
                    debug!(evicted, "Swept expired local cache entries");
                }
            }
        })
    }
}
