//! Prometheus metrics for the prediction service.
//!
//! Covers:
//! - HTTP request counts and latency
//! - Predictions by outcome and inference latency
//! - Rejected prediction requests
//! - Recommendation source (model or rule engine)
//!
//! # Example
//! ```no_run
//! use maintenance_predictor::metrics::{HTTP_REQUESTS_TOTAL};
//!
//! HTTP_REQUESTS_TOTAL
//!     .with_label_values(&["GET", "/health", "200"])
//!     .inc();
//! ```

pub mod middleware;

pub use middleware::track_metrics;

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry,
};
use std::time::Duration;

const NAMESPACE: &str = "maintenance_predictor";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Prediction Metrics
    // ============================================================================

    /// Total number of predictions served
    ///
    /// Labels: outcome (class label)
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of predictions served")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Prediction requests rejected by schema validation
    pub static ref VALIDATION_FAILURES_TOTAL: Counter = Counter::with_opts(
        Opts::new(
            "validation_failures_total",
            "Prediction requests rejected by schema validation"
        )
        .namespace(NAMESPACE)
    ).expect("Failed to create VALIDATION_FAILURES_TOTAL metric");

    /// Time spent encoding and classifying one request
    pub static ref INFERENCE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "inference_duration_seconds",
            "Model inference duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5])
    ).expect("Failed to create INFERENCE_DURATION_SECONDS metric");

    /// Recommendation sets produced
    ///
    /// Labels: source (ai, rules)
    pub static ref RECOMMENDATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("recommendations_total", "Recommendation sets produced")
            .namespace(NAMESPACE),
        &["source"]
    ).expect("Failed to create RECOMMENDATIONS_TOTAL metric");

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Application build info
    ///
    /// Labels: version, model_type
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace(NAMESPACE),
        &["version", "model_type"]
    ).expect("Failed to create BUILD_INFO metric");

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = Gauge::with_opts(
        Opts::new("uptime_seconds", "Application uptime in seconds")
            .namespace(NAMESPACE)
    ).expect("Failed to create UPTIME_SECONDS metric");
}

fn collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(PREDICTIONS_TOTAL.clone()),
        Box::new(VALIDATION_FAILURES_TOTAL.clone()),
        Box::new(INFERENCE_DURATION_SECONDS.clone()),
        Box::new(RECOMMENDATIONS_TOTAL.clone()),
        Box::new(BUILD_INFO.clone()),
        Box::new(UPTIME_SECONDS.clone()),
    ]
}

/// Register all metrics with the Prometheus registry.
///
/// Safe to call more than once; metrics already registered are skipped.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    for collector in collectors() {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::debug!("Prometheus metrics initialized");
    Ok(())
}

/// Record the loaded model in the build info gauge
pub fn set_build_info(model_type: &str) {
    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION"), model_type])
        .set(1.0);
}

/// Record one served prediction
pub fn record_prediction(outcome: &str, elapsed: Duration) {
    PREDICTIONS_TOTAL.with_label_values(&[outcome]).inc();
    INFERENCE_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}

pub fn record_validation_failure() {
    VALIDATION_FAILURES_TOTAL.inc();
}

pub fn record_recommendations(source: &str) {
    RECOMMENDATIONS_TOTAL.with_label_values(&[source]).inc();
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_record_prediction() {
        init_metrics().unwrap();
        let before = PREDICTIONS_TOTAL.with_label_values(&["1"]).get();

        record_prediction("1", Duration::from_micros(250));

        assert_eq!(PREDICTIONS_TOTAL.with_label_values(&["1"]).get(), before + 1.0);
        assert!(INFERENCE_DURATION_SECONDS.get_sample_count() >= 1);
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().unwrap();
        record_recommendations("rules");

        let metrics = gather_metrics();
        assert!(metrics.contains("maintenance_predictor_recommendations_total"));
        assert!(metrics.contains("source=\"rules\""));
    }
}
