use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::delivery::{
    METRIC_FEED_ASSEMBLE_MS, METRIC_FEED_FRESH, METRIC_FEED_HIT, METRIC_FEED_INCONSISTENT,
    METRIC_FEED_NOT_MODIFIED, METRIC_FEED_REGENERATE,
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_FEED_FRESH,
            Unit::Count,
            "Feed responses assembled for the request."
        );
        describe_counter!(
            METRIC_FEED_HIT,
            Unit::Count,
            "Feed responses served from the feed cache."
        );
        describe_counter!(
            METRIC_FEED_NOT_MODIFIED,
            Unit::Count,
            "Conditional feed requests answered with 304."
        );
        describe_counter!(
            METRIC_FEED_REGENERATE,
            Unit::Count,
            "Feed bodies assembled from the content source."
        );
        describe_counter!(
            METRIC_FEED_INCONSISTENT,
            Unit::Count,
            "Feed cache lookups that found some slots without their siblings."
        );
        describe_histogram!(
            METRIC_FEED_ASSEMBLE_MS,
            Unit::Milliseconds,
            "Feed assembly latency in milliseconds."
        );
    });
}
