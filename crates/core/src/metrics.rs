//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Background jobs (archive, deploy, visualize)
//! - Admission of lifecycle operations
//! - Crawls

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Background Jobs
// =============================================================================

/// Finished background jobs by operation and outcome.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("statif_jobs_total", "Total finished background jobs"),
        &["operation", "outcome"], // outcome: "success" or an error kind
    )
    .unwrap()
});

/// Background job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "statif_job_duration_seconds",
            "Duration of background lifecycle jobs",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["operation"],
    )
    .unwrap()
});

// =============================================================================
// Admission
// =============================================================================

/// Lifecycle operations refused before reaching the executor.
pub static OPERATIONS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "statif_operations_rejected_total",
            "Lifecycle operations rejected synchronously",
        ),
        &["operation", "kind"],
    )
    .unwrap()
});

// =============================================================================
// Crawls
// =============================================================================

pub static CRAWLS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("statif_crawls_started_total", "Total crawls started").unwrap()
});

pub static CRAWLS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "statif_crawls_completed_total",
        "Total crawls observed as finished",
    )
    .unwrap()
});

/// All core metrics, for registration by the server.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(OPERATIONS_REJECTED.clone()),
        Box::new(CRAWLS_STARTED.clone()),
        Box::new(CRAWLS_COMPLETED.clone()),
    ]
}
