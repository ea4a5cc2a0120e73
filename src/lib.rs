//! Driftline social feed backend
//!
//! A small social feed service whose write path fans posts out to follower
//! timelines asynchronously. Posts are enqueued into a durable fanout queue
//! at creation time; a background worker pool drains the queue and appends
//! timeline entries to the in-memory cache and the durable timeline store.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod fanout;
pub mod metrics;
pub mod service;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::data::{Database, TimelineCache};
use crate::error::Result;
use crate::fanout::FanoutWorker;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub timeline_cache: Arc<TimelineCache>,
}

impl AppState {
    /// Open the database, run migrations and build the shared state.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = Database::connect(&config.database.path).await?;
        let timeline_cache = TimelineCache::new(config.cache.timeline_max_items);

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            timeline_cache: Arc::new(timeline_cache),
        })
    }

    /// Build the fanout worker wired to this state's stores.
    pub fn fanout_worker(&self) -> Arc<FanoutWorker> {
        Arc::new(FanoutWorker::new(
            self.db.clone(),
            self.db.clone(),
            self.timeline_cache.clone(),
            self.db.clone(),
            &self.config.fanout,
        ))
    }
}

async fn health() -> &'static str {
    "OK"
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(metrics::metrics_router())
        .nest("/api", api::api_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
