//! Prometheus metrics for monitoring the chat relay.
//!
//! Metrics live in the process-wide default registry and are exposed by the
//! `/metrics` endpoint.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint, provider, and status
    pub request_count: IntCounterVec,

    /// Time until the response head is ready, in seconds. For event streams
    /// this is time to first byte rather than total duration.
    pub request_duration: HistogramVec,

    /// Number of currently active requests by endpoint
    pub active_requests: GaugeVec,

    /// Outbound events written to callers by provider and event kind
    pub stream_events: IntCounterVec,

    /// Failures by provider and error category
    pub relay_errors: IntCounterVec,

    /// Time from session open to first non-empty fragment, in seconds
    pub ttft: HistogramVec,

    /// Event streams abandoned by the caller before they finished
    pub client_disconnects: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call more than once; every call returns the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "chat_relay_requests_total",
            "Total number of requests",
            &["method", "endpoint", "provider", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "chat_relay_request_duration_seconds",
            "Time until response headers are ready, in seconds",
            &["method", "endpoint", "provider"],
            vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
        )
        .expect("Failed to register request_duration metric");

        let active_requests = register_gauge_vec!(
            "chat_relay_active_requests",
            "Number of active requests",
            &["endpoint"]
        )
        .expect("Failed to register active_requests metric");

        let stream_events = register_int_counter_vec!(
            "chat_relay_stream_events_total",
            "Server-sent events written to callers",
            &["provider", "event"]
        )
        .expect("Failed to register stream_events metric");

        let relay_errors = register_int_counter_vec!(
            "chat_relay_errors_total",
            "Relay failures by provider and category",
            &["provider", "category"]
        )
        .expect("Failed to register relay_errors metric");

        let ttft = register_histogram_vec!(
            "chat_relay_ttft_seconds",
            "Time to first fragment from the upstream provider, in seconds",
            &["provider", "model"],
            vec![0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
        )
        .expect("Failed to register ttft metric");

        let client_disconnects = register_int_counter_vec!(
            "chat_relay_client_disconnects_total",
            "Event streams dropped by the caller before completion",
            &["provider"]
        )
        .expect("Failed to register client_disconnects metric");

        Metrics {
            request_count,
            request_duration,
            active_requests,
            stream_events,
            relay_errors,
            ttft,
            client_disconnects,
        }
    })
}

/// Get the global metrics instance, registering it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = init_metrics();
        let metrics2 = get_metrics();
        assert!(std::ptr::eq(metrics, metrics2));
    }

    #[test]
    fn test_stream_events_metric() {
        let metrics = init_metrics();

        let counter = metrics
            .stream_events
            .with_label_values(&["metrics-test-provider", "message"]);
        let initial = counter.get();
        counter.inc();
        assert_eq!(counter.get(), initial + 1);
    }

    #[test]
    fn test_active_requests_metric() {
        let metrics = init_metrics();
        let gauge = metrics.active_requests.with_label_values(&["/metrics-test"]);

        let initial = gauge.get();
        gauge.inc();
        assert_eq!(gauge.get(), initial + 1.0);
        gauge.dec();
        assert_eq!(gauge.get(), initial);
    }

    #[test]
    fn test_ttft_metric() {
        let metrics = init_metrics();
        let histogram = metrics
            .ttft
            .with_label_values(&["metrics-test-provider", "model-x"]);

        histogram.observe(0.3);
        histogram.observe(1.2);
        assert!(histogram.get_sample_count() >= 2);
    }
}
