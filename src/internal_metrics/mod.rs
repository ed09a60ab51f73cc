//! # Internal Metrics Module
//!
//! - **`MetricsBuilder`**: installs the Prometheus recorder and hands back the
//!   `PrometheusHandle` the HTTP server renders on `/metrics`.
//!
//! - **`Metrics`**: a lightweight, cloneable handle the dispatcher uses to
//!   record deliveries. When no recorder is installed every call is a no-op.

use crate::config::MetricsConfig;
use crate::core::ChannelKind;
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing::error;

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub notifications_dispatched_total: Counter,
    pub alerts_received_total: Counter,
    pub dispatch_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Registers descriptions with the global recorder and returns handles.
    pub fn new() -> Self {
        metrics::describe_counter!("notifications_dispatched_total", Unit::Count, "Total number of notifications dispatched, one per send, test or alert.");
        metrics::describe_counter!("alerts_received_total", Unit::Count, "Total number of alerts received through the Alertmanager webhook.");
        metrics::describe_counter!("channel_deliveries_total", Unit::Count, "Channel delivery attempts, labeled by channel and outcome.");
        metrics::describe_counter!("webhook_endpoint_deliveries_total", Unit::Count, "Generic webhook endpoint deliveries, labeled by outcome.");
        metrics::describe_histogram!("dispatch_duration_seconds", Unit::Seconds, "Time from dispatch start until every attempted channel reported back.");

        Self {
            notifications_dispatched_total: metrics::counter!("notifications_dispatched_total"),
            alerts_received_total: metrics::counter!("alerts_received_total"),
            dispatch_duration_seconds: metrics::histogram!("dispatch_duration_seconds"),
        }
    }

    /// Counts one dispatched notification, whether or not any channel was attempted.
    pub fn record_dispatch(&self) {
        self.notifications_dispatched_total.increment(1);
    }

    pub fn record_dispatch_duration(&self, elapsed: Duration) {
        self.dispatch_duration_seconds.record(elapsed.as_secs_f64());
    }

    /// Records one channel attempt.
    pub fn record_delivery(&self, channel: ChannelKind, success: bool) {
        metrics::counter!(
            "channel_deliveries_total",
            "channel" => channel.as_str(),
            "outcome" => outcome_label(success)
        )
        .increment(1);
    }

    /// Records one generic webhook endpoint attempt.
    pub fn record_endpoint(success: bool) {
        metrics::counter!("webhook_endpoint_deliveries_total", "outcome" => outcome_label(success))
            .increment(1);
    }

    pub fn record_alerts(&self, count: usize) {
        self.alerts_received_total.increment(count as u64);
    }
}

fn outcome_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder as the global recorder.
    ///
    /// Returns `None` when metrics are disabled or the recorder could not be
    /// installed; the relay keeps running without metrics in that case.
    pub fn build(self) -> Option<PrometheusHandle> {
        if !self.config.enabled {
            return None;
        }

        let builder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        ) {
            Ok(builder) => builder,
            Err(e) => {
                error!("Failed to configure Prometheus buckets: {}", e);
                return None;
            }
        };

        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return None;
        }

        Some(handle)
    }
}
