use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "bancarella_cache_scan_served_total",
            Unit::Count,
            "Scans answered from the cache after count reconciliation agreed."
        );
        describe_counter!(
            "bancarella_cache_scan_rebuild_total",
            Unit::Count,
            "Scans that detected a count mismatch and rebuilt the partition."
        );
        describe_counter!(
            "bancarella_cache_get_hit_total",
            Unit::Count,
            "Point lookups served from the cache."
        );
        describe_counter!(
            "bancarella_cache_get_miss_total",
            Unit::Count,
            "Point lookups that fell through to the repository."
        );
        describe_counter!(
            "bancarella_cache_store_degraded_total",
            Unit::Count,
            "Cache store operations degraded to a miss (unreachable or timed out)."
        );
        describe_counter!(
            "bancarella_cache_local_evicted_total",
            Unit::Count,
            "Entries evicted from the process-local TTL cache."
        );
    });
}
