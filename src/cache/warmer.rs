//! Startup cache warming.
//!
//! One scan per registered namespace so the first user-facing requests
//! are served warm. Failures are logged and never fatal: a cold cache is
//! a slower first read, not an outage.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::repos::RepoError;

use super::collection::CachedCollection;
use super::entity::CacheEntity;
use super::keys::Namespace;

/// A collection the warmer can prime.
#[async_trait]
pub trait WarmTarget: Send + Sync {
    fn namespace(&self) -> Namespace;

    /// Prime the namespace, returning how many entities were loaded.
    async fn warm(&self) -> Result<usize, RepoError>;
}

#[async_trait]
impl<T: CacheEntity> WarmTarget for CachedCollection<T> {
    fn namespace(&self) -> Namespace {
        T::NAMESPACE
    }

    async fn warm(&self) -> Result<usize, RepoError> {
        Ok(self.scan(&[]).await?.len())
    }
}

/// Runs one warm pass over every registered collection.
#[derive(Default)]
pub struct CacheWarmer {
    targets: Vec<Arc<dyn WarmTarget>>,
}

impl CacheWarmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: Arc<dyn WarmTarget>) -> &mut Self {
        self.targets.push(target);
        self
    }

    pub async fn warm_all(&self) {
        for target in &self.targets {
            match target.warm().await {
                Ok(loaded) => {
                    info!(namespace = %target.namespace(), loaded, "Warmed cache namespace");
                }
                Err(err) => {
                    warn!(
                        namespace = %target.namespace(),
                        error = %err,
                        "Cache warm pass failed, first reads will be cold"
                    );
                }
            }
        }
    }
}
