//! Prometheus metrics
//!
//! Registry, instruments and the `/metrics` scrape endpoint. Instruments
//! are global so any layer can record without threading handles around;
//! `init_metrics` must run once at startup before the first scrape.

use axum::{Router, http::StatusCode, http::header, response::IntoResponse, routing::get};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Fanout Metrics
    pub static ref FANOUT_JOBS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_fanout_jobs_total", "Total number of fanout jobs finalized"),
        &["result"]
    ).expect("metric can be created");
    pub static ref FANOUT_BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_fanout_batches_total", "Total number of fanout batches attempted"),
        &["status"]
    ).expect("metric can be created");
    pub static ref FANOUT_QUEUE_PENDING: IntGauge = IntGauge::new(
        "driftline_fanout_queue_pending",
        "Pending fanout jobs seen by the last poll"
    ).expect("metric can be created");
    pub static ref TIMELINE_ENTRIES_WRITTEN: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_timeline_entries_written_total", "Timeline rows written per sink"),
        &["sink"]
    ).expect("metric can be created");

    // Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_SIZE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("driftline_cache_size", "Current number of items in cache"),
        &["cache_name"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("driftline_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(FANOUT_JOBS_TOTAL.clone()))
        .expect("FANOUT_JOBS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(FANOUT_BATCHES_TOTAL.clone()))
        .expect("FANOUT_BATCHES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(FANOUT_QUEUE_PENDING.clone()))
        .expect("FANOUT_QUEUE_PENDING can be registered");
    REGISTRY
        .register(Box::new(TIMELINE_ENTRIES_WRITTEN.clone()))
        .expect("TIMELINE_ENTRIES_WRITTEN can be registered");
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_SIZE.clone()))
        .expect("CACHE_SIZE can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Serve the registry contents in Prometheus text exposition format.
async fn export_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(error) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(%error, "metrics encoding failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type())], buffer).into_response()
}

/// Router exposing `GET /metrics` for scrapers.
pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(export_metrics))
}
