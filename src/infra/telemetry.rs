use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const METRIC_CACHE_HIT: &str = "fontproxy_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "fontproxy_cache_miss_total";
pub const METRIC_CACHE_STALE: &str = "fontproxy_cache_stale_total";
pub const METRIC_CACHE_WRITE_ERROR: &str = "fontproxy_cache_write_error_total";
pub const METRIC_ORIGIN_ERROR: &str = "fontproxy_origin_error_total";
pub const METRIC_ORIGIN_FETCH_MS: &str = "fontproxy_origin_fetch_ms";

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

/// Register descriptions for every metric the proxy emits. Safe to call repeatedly.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Requests answered from a fresh on-disk entry."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Requests that had to be fetched from the origin."
        );
        describe_counter!(
            METRIC_CACHE_STALE,
            Unit::Count,
            "Expired entries deleted on access."
        );
        describe_counter!(
            METRIC_CACHE_WRITE_ERROR,
            Unit::Count,
            "Origin payloads that could not be persisted to disk."
        );
        describe_counter!(
            METRIC_ORIGIN_ERROR,
            Unit::Count,
            "Origin fetches that failed at the transport level."
        );
        describe_histogram!(
            METRIC_ORIGIN_FETCH_MS,
            Unit::Milliseconds,
            "Origin fetch latency in milliseconds."
        );
    });
}
