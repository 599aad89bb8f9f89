//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the statif server:
//! - HTTP request metrics (latency, counts)
//! - Lifecycle state (collected dynamically)
//! - Core job and crawl metrics (registered from `statif_core::metrics`)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "statif_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("statif_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "statif_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Lifecycle State
// =============================================================================

/// 1 while the lifecycle lock is held.
pub static LOCK_HELD: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("statif_lock_held", "Whether the lifecycle lock is held").unwrap()
});

/// 1 while a crawl process is alive.
pub static CRAWL_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("statif_crawl_running", "Whether a crawl is running").unwrap()
});

/// Pages crawled by the current crawl.
pub static ITEMS_CRAWLED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "statif_items_crawled",
        "Pages crawled so far by the current crawl",
    )
    .unwrap()
});

/// Statifications recorded in the store.
pub static STATIFICATIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("statif_statifications", "Number of recorded statifications").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Lifecycle
    registry.register(Box::new(LOCK_HELD.clone())).unwrap();
    registry.register(Box::new(CRAWL_RUNNING.clone())).unwrap();
    registry.register(Box::new(ITEMS_CRAWLED.clone())).unwrap();
    registry.register(Box::new(STATIFICATIONS.clone())).unwrap();

    // Core metrics (jobs, admission, crawls)
    for metric in statif_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the lifecycle right now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let lifecycle = state.lifecycle();

    match lifecycle.status() {
        Ok(view) => {
            LOCK_HELD.set(i64::from(view.locked));
            CRAWL_RUNNING.set(i64::from(view.crawling));
            ITEMS_CRAWLED.set(view.items_crawled);
        }
        Err(e) => warn!(error = %e, "Failed to collect lifecycle status metrics"),
    }

    if let Ok(count) = lifecycle.count() {
        STATIFICATIONS.set(count);
    }
}

static HASH_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-zA-Z]{40}").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace hashes and ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = HASH_SEGMENT.replace_all(path, "{hash}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_hash() {
        let path = format!("/api/v1/statifications/{}/deploy", "a".repeat(40));
        assert_eq!(
            normalize_path(&path),
            "/api/v1/statifications/{hash}/deploy"
        );
    }

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/items/12345"), "/api/v1/items/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(
            normalize_path("/api/v1/statifications/status"),
            "/api/v1/statifications/status"
        );
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("statif_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        statif_core::metrics::CRAWLS_STARTED.inc();
        statif_core::metrics::JOBS_TOTAL
            .with_label_values(&["archive", "success"])
            .inc();
        LOCK_HELD.set(0);

        let output = encode_metrics();
        assert!(output.contains("statif_crawls_started_total"));
        assert!(output.contains("statif_jobs_total"));
        assert!(output.contains("statif_lock_held"));
    }
}
