//! Tracing and metrics bootstrap.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

pub(crate) const METRIC_CACHE_HIT: &str = "foglio_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "foglio_cache_miss_total";
pub(crate) const METRIC_CACHE_STALE: &str = "foglio_cache_stale_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "foglio_cache_expired_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "foglio_cache_evict_total";
pub(crate) const METRIC_CACHE_DEGRADED: &str = "foglio_cache_degraded_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
#[error("telemetry initialization failed: {0}")]
pub struct TelemetryError(String);

/// Install a global tracing subscriber using the provided logging settings.
///
/// Embedders that own their own subscriber skip this; metric emission works
/// either way and is a no-op without an installed recorder.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError(format!("failed to install tracing subscriber: {err}")))
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Cache lookups that returned an entry."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Cache lookups with no entry, including expired ones."
        );
        describe_counter!(
            METRIC_CACHE_STALE,
            Unit::Count,
            "Cached entries discarded because the backing file changed."
        );
        describe_counter!(
            METRIC_CACHE_EXPIRED,
            Unit::Count,
            "Cached entries removed by the flush-interval deadline check."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Cached entries evicted by backend capacity limits."
        );
        describe_counter!(
            METRIC_CACHE_DEGRADED,
            Unit::Count,
            "Requests served uncached after a cache backend failure."
        );
    });
}
