//! Cache configuration.
//!
//! TTLs are per-namespace policy, not per-entity: slow-changing catalog
//! taxonomy holds for a week, promotional surfaces for minutes.

use std::time::Duration;

use super::keys::Namespace;

const DEFAULT_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_BANNER_TTL_SECS: u64 = 5 * 60;
const DEFAULT_CATALOG_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_MEDIA_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_USER_TTL_SECS: u64 = 60 * 60;
const DEFAULT_SHOPPER_TTL_SECS: u64 = 60 * 60;
const DEFAULT_LOCAL_SWEEP_INTERVAL_SECS: u64 = 60;

/// Runtime cache policy shared by every [`super::CachedCollection`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Disabling the cache routes every read straight to the repository.
    pub enabled: bool,
    /// Upper bound for a single cache-store operation. A slow cache must
    /// not make a request slower than an uncached read.
    pub op_timeout: Duration,
    pub banner_ttl: Duration,
    pub catalog_ttl: Duration,
    pub media_ttl: Duration,
    pub user_ttl: Duration,
    pub shopper_ttl: Duration,
    /// Interval for the process-local flavor's proactive expiry sweep.
    pub local_sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
            banner_ttl: Duration::from_secs(DEFAULT_BANNER_TTL_SECS),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            media_ttl: Duration::from_secs(DEFAULT_MEDIA_TTL_SECS),
            user_ttl: Duration::from_secs(DEFAULT_USER_TTL_SECS),
            shopper_ttl: Duration::from_secs(DEFAULT_SHOPPER_TTL_SECS),
            local_sweep_interval: Duration::from_secs(DEFAULT_LOCAL_SWEEP_INTERVAL_SECS),
        }
    }
}

impl CacheConfig {
    /// TTL policy for one namespace.
    pub fn ttl(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Banner => self.banner_ttl,
            Namespace::Category | Namespace::Subcategory | Namespace::ProductType => {
                self.catalog_ttl
            }
            Namespace::MediaItem => self.media_ttl,
            Namespace::User => self.user_ttl,
            Namespace::CartLine | Namespace::WishlistLine => self.shopper_ttl,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            op_timeout: Duration::from_millis(settings.op_timeout_ms),
            banner_ttl: Duration::from_secs(settings.banner_ttl_secs),
            catalog_ttl: Duration::from_secs(settings.catalog_ttl_secs),
            media_ttl: Duration::from_secs(settings.media_ttl_secs),
            user_ttl: Duration::from_secs(settings.user_ttl_secs),
            shopper_ttl: Duration::from_secs(settings.shopper_ttl_secs),
            local_sweep_interval: Duration::from_secs(settings.local_sweep_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_policy_per_namespace() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(Namespace::Banner), Duration::from_secs(300));
        assert_eq!(
            config.ttl(Namespace::Category),
            Duration::from_secs(7 * 24 * 60 * 60)
        );
        assert_eq!(
            config.ttl(Namespace::Subcategory),
            config.ttl(Namespace::ProductType)
        );
        assert_eq!(
            config.ttl(Namespace::CartLine),
            config.ttl(Namespace::WishlistLine)
        );
    }

    #[test]
    fn enabled_by_default() {
        assert!(CacheConfig::default().enabled);
        assert_eq!(
            CacheConfig::default().op_timeout,
            Duration::from_millis(250)
        );
    }
}
