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

/// Install the global subscriber. Events go to stderr; stdout carries
/// command output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .with_target(true)
            .boxed(),
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
            "newsdesk_listing_cache_hit_total",
            Unit::Count,
            "Total number of listings served from cache."
        );
        describe_counter!(
            "newsdesk_listing_cache_miss_total",
            Unit::Count,
            "Total number of listings recomputed from the store."
        );
        describe_counter!(
            "newsdesk_listing_cache_error_total",
            Unit::Count,
            "Total number of listing cache failures, labelled by operation."
        );
        describe_counter!(
            "newsdesk_listing_cache_invalidate_total",
            Unit::Count,
            "Total number of listing namespace sweeps after mutations."
        );
        describe_counter!(
            "newsdesk_ingest_variant_total",
            Unit::Count,
            "Total number of image derivatives published, labelled by variant."
        );
    });
}
