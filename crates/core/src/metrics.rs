//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fetch jobs (results, duration, permits in use)
//! - Searches and selection sessions
//! - Artifact disposal

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Fetch Jobs
// =============================================================================

/// Fetch jobs total by result.
pub static FETCH_JOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("comicrelay_fetch_jobs_total", "Total fetch jobs by result"),
        &["result"], // "completed" or an error kind label
    )
    .unwrap()
});

/// Fetch job duration in seconds, measured from permit grant.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "comicrelay_fetch_duration_seconds",
            "Duration of fetch jobs while holding a permit",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Limiter permits currently held.
pub static PERMITS_IN_USE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "comicrelay_permits_in_use",
        "Number of concurrency permits currently held",
    )
    .unwrap()
});

// =============================================================================
// Searches & Sessions
// =============================================================================

/// Searches total by outcome.
pub static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("comicrelay_searches_total", "Total searches by outcome"),
        &["outcome"], // "results", "empty", "failed"
    )
    .unwrap()
});

/// Live selection sessions.
pub static ACTIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "comicrelay_active_sessions",
        "Number of selection sessions currently stored",
    )
    .unwrap()
});

/// Selection attempts by outcome.
pub static SELECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("comicrelay_selections_total", "Selection replies by outcome"),
        &["outcome"], // "selected", "invalid", "cancelled", "expired"
    )
    .unwrap()
});

// =============================================================================
// Artifacts
// =============================================================================

/// Artifact disposals by outcome.
pub static DISPOSALS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("comicrelay_artifact_disposals_total", "Artifact disposals by outcome"),
        &["outcome"], // "deleted", "retained", "already_absent", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(FETCH_JOBS.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(PERMITS_IN_USE.clone()),
        // Sessions
        Box::new(SEARCHES.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
        Box::new(SELECTIONS.clone()),
        // Artifacts
        Box::new(DISPOSALS.clone()),
    ]
}
