//! Trait implemented by every entity family that participates in caching.

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::keys::{Namespace, Partition};

/// A record that can live in the cache.
///
/// `id` is assigned by the repository at creation and never changes.
/// Partition values may change between writes; mutation paths are
/// responsible for removing the key under the old partition when they do.
pub trait CacheEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const NAMESPACE: Namespace;

    fn id(&self) -> Uuid;

    /// Current partition values, in the namespace's dimension order.
    fn partitions(&self) -> Vec<Partition>;
}
