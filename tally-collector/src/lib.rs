//! tally-collector library interface
//!
//! Exposes the collection pipeline and the admin HTTP surface for the binary
//! and for integration testing.

pub mod admin;
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod news;
pub mod resolver;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod summary;
pub mod trust;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Utc};
use tally_common::config::TomlConfig;
use tally_common::events::EventBus;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::extract::TextExtractor;
use crate::news::NewsCollector;
use crate::resolver::ConflictResolver;
use crate::scheduler::{CollectionScheduler, ElectionTimeline};
use crate::sources::SourceRegistry;
use crate::store::ElectionStore;

/// Runtime knobs taken from the bootstrap configuration
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub fetch_timeout: Duration,
    pub timeline: ElectionTimeline,
    pub news_enabled: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

impl ServiceSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.collector.fetch_timeout_secs),
            timeline: ElectionTimeline::from_config(&config.election),
            news_enabled: config.collector.news_enabled,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ElectionStore>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub registry: Arc<SourceRegistry>,
    pub resolver: Arc<ConflictResolver>,
    pub news: Arc<NewsCollector>,
    pub scheduler: Arc<CollectionScheduler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ElectionStore>,
        event_bus: EventBus,
        extractor: Arc<dyn TextExtractor>,
        settings: ServiceSettings,
    ) -> Self {
        let registry = Arc::new(SourceRegistry::new(
            Arc::clone(&extractor),
            settings.fetch_timeout,
        ));
        let resolver = Arc::new(ConflictResolver::new(Arc::clone(&store)));
        let news = Arc::new(NewsCollector::new(Arc::clone(&store), extractor));
        news.set_enabled(settings.news_enabled);

        let scheduler = Arc::new(CollectionScheduler::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&resolver),
            Arc::clone(&news),
            event_bus.clone(),
            settings.timeline,
        ));

        Self {
            store,
            event_bus,
            registry,
            resolver,
            news,
            scheduler,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::collection_routes())
        .merge(api::source_routes())
        .merge(api::result_routes())
        .merge(api::review_routes())
        .merge(api::content_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
