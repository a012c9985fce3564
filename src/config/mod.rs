//! Configuration layer: typed settings with layered precedence (file → env).

use std::{num::NonZeroU32, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "bancarella";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_BANNER_TTL_SECS: u64 = 5 * 60;
const DEFAULT_CATALOG_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_MEDIA_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_USER_TTL_SECS: u64 = 60 * 60;
const DEFAULT_SHOPPER_TTL_SECS: u64 = 60 * 60;
const DEFAULT_LOCAL_SWEEP_INTERVAL_SECS: u64 = 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

/// Cache wiring and per-namespace TTL policy, in wire-friendly units.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub redis_url: Option<String>,
    pub op_timeout_ms: u64,
    pub banner_ttl_secs: u64,
    pub catalog_ttl_secs: u64,
    pub media_ttl_secs: u64,
    pub user_ttl_secs: u64,
    pub shopper_ttl_secs: u64,
    pub local_sweep_interval_secs: u64,
}

impl CacheSettings {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment).
pub fn load() -> Result<Settings, LoadError> {
    let raw: RawSettings = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false))
        .add_source(Environment::with_prefix("BANCARELLA").separator("__"))
        .build()?
        .try_deserialize()?;

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LoadError::invalid("database.url", "connection URL is required"))?;

    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_connections.into(), "database.max_connections")?.get();

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let enabled = cache.enabled.unwrap_or(true);

    let redis_url = cache.redis_url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    if enabled && redis_url.is_none() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "required while cache.enabled is true",
        ));
    }

    let op_timeout_ms = cache.op_timeout_ms.unwrap_or(DEFAULT_CACHE_OP_TIMEOUT_MS);
    if op_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.op_timeout_ms",
            "must be greater than zero",
        ));
    }

    let local_sweep_interval_secs = cache
        .local_sweep_interval_secs
        .unwrap_or(DEFAULT_LOCAL_SWEEP_INTERVAL_SECS);
    if local_sweep_interval_secs == 0 {
        return Err(LoadError::invalid(
            "cache.local_sweep_interval_secs",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled,
        redis_url,
        op_timeout_ms,
        banner_ttl_secs: ttl_secs(cache.banner_ttl_secs, DEFAULT_BANNER_TTL_SECS, "cache.banner_ttl_secs")?,
        catalog_ttl_secs: ttl_secs(
            cache.catalog_ttl_secs,
            DEFAULT_CATALOG_TTL_SECS,
            "cache.catalog_ttl_secs",
        )?,
        media_ttl_secs: ttl_secs(cache.media_ttl_secs, DEFAULT_MEDIA_TTL_SECS, "cache.media_ttl_secs")?,
        user_ttl_secs: ttl_secs(cache.user_ttl_secs, DEFAULT_USER_TTL_SECS, "cache.user_ttl_secs")?,
        shopper_ttl_secs: ttl_secs(
            cache.shopper_ttl_secs,
            DEFAULT_SHOPPER_TTL_SECS,
            "cache.shopper_ttl_secs",
        )?,
        local_sweep_interval_secs,
    })
}

fn ttl_secs(value: Option<u64>, default: u64, key: &'static str) -> Result<u64, LoadError> {
    let secs = value.unwrap_or(default);
    if secs == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(secs)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    redis_url: Option<String>,
    op_timeout_ms: Option<u64>,
    banner_ttl_secs: Option<u64>,
    catalog_ttl_secs: Option<u64>,
    media_ttl_secs: Option<u64>,
    user_ttl_secs: Option<u64>,
    shopper_ttl_secs: Option<u64>,
    local_sweep_interval_secs: Option<u64>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_database() -> RawSettings {
        let mut raw = RawSettings::default();
        raw.database.url = Some("postgres://localhost/bancarella".to_string());
        raw.cache.redis_url = Some("redis://localhost:6379".to_string());
        raw
    }

    #[test]
    fn database_url_is_required() {
        let err = Settings::from_raw(RawSettings::default()).expect_err("missing url");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "database.url",
                ..
            }
        ));
    }

    #[test]
    fn cache_defaults_resolve() {
        let settings = Settings::from_raw(raw_with_database()).expect("valid settings");
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.op_timeout(), Duration::from_millis(250));
        assert_eq!(settings.cache.banner_ttl_secs, 300);
        assert_eq!(settings.cache.catalog_ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(settings.database.max_connections, 8);
    }

    #[test]
    fn enabled_cache_requires_redis_url() {
        let mut raw = raw_with_database();
        raw.cache.redis_url = None;
        let err = Settings::from_raw(raw).expect_err("missing redis url");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cache.redis_url",
                ..
            }
        ));
    }

    #[test]
    fn disabled_cache_tolerates_missing_redis_url() {
        let mut raw = raw_with_database();
        raw.cache.enabled = Some(false);
        raw.cache.redis_url = None;
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(!settings.cache.enabled);
        assert!(settings.cache.redis_url.is_none());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut raw = raw_with_database();
        raw.cache.banner_ttl_secs = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn log_level_parses_from_string() {
        let mut raw = raw_with_database();
        raw.logging.level = Some("debug".to_string());
        raw.logging.json = Some(true);
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert!(matches!(settings.logging.format, LogFormat::Json));
    }
}
