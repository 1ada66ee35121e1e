//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("horizon_http_requests_total", "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "horizon_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method"]
    ).expect("metric can be created");

    // Engine Metrics
    pub static ref INTERACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("horizon_interactions_total", "Committed interaction mutations"),
        &["action"]
    ).expect("metric can be created");
    pub static ref TRANSACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("horizon_transactions_total", "Write transactions by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref NOTIFICATION_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("horizon_notification_failures_total", "Notifications that could not be stored"),
        &["type"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("horizon_errors_total", "Total number of errors returned to clients"),
        &["kind"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("HTTP_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(INTERACTIONS_TOTAL.clone()))
            .expect("INTERACTIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TRANSACTIONS_TOTAL.clone()))
            .expect("TRANSACTIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(NOTIFICATION_FAILURES_TOTAL.clone()))
            .expect("NOTIFICATION_FAILURES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
