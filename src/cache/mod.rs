//! Bancarella cache system.
//!
//! Cache-aside collections over a networked key-value store, guarded by a
//! cardinality-reconciliation protocol:
//!
//! - **KeyScheme** ([`keys`]): deterministic `namespace:dim=value:id`
//!   keys and the glob patterns that enumerate a partition.
//! - **CacheStore** ([`store`]): thin, failure-tolerant wrapper over
//!   Redis (plus an in-memory twin) where an unreachable store is a miss,
//!   never an error.
//! - **CachedCollection** ([`collection`]): the reconciliation engine;
//!   scans compare the repository row count against the matching key
//!   count and rebuild the partition on any mismatch.
//! - **LocalTtlCache** ([`local`]): the simpler process-local flavor with
//!   coarse `clear()` invalidation.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `bancarella.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! redis_url = "redis://127.0.0.1:6379"
//! op_timeout_ms = 250
//! banner_ttl_secs = 300
//! catalog_ttl_secs = 604800
//! ```

mod collection;
mod config;
mod entity;
pub mod keys;
mod local;
mod store;
mod warmer;

pub use collection::{CachedCollection, CollectionRepo};
pub use config::CacheConfig;
pub use entity::CacheEntity;
pub use keys::{Namespace, Partition};
pub use local::LocalTtlCache;
pub use store::{CacheStore, MemoryStore, RedisStore};
pub use warmer::{CacheWarmer, WarmTarget};
