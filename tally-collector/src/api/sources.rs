//! Source catalog endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tally_common::models::SourceHealth;
use tracing::info;

use crate::sources::{SourceConfig, SourceSummary};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceView {
    #[serde(flatten)]
    pub config: SourceConfig,
    pub health: Option<SourceHealth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesResponse {
    pub sources: Vec<SourceView>,
    pub summary: SourceSummary,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub active: bool,
}

/// GET /api/sources
pub async fn list_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    let configs = state.registry.configs().await;
    let health = state.registry.health().await;

    let sources = configs
        .into_iter()
        .map(|config| {
            let health = health.iter().find(|h| h.id == config.id).cloned();
            SourceView { config, health }
        })
        .collect();

    Json(SourcesResponse {
        sources,
        summary: state.registry.summary().await,
    })
}

/// POST /api/sources/:id/toggle
pub async fn toggle_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Json<SourceHealth>> {
    if !state.registry.toggle_source(&id, request.active).await {
        return Err(ApiError::NotFound(format!("source {}", id)));
    }
    info!(source = %id, active = request.active, "Source toggled");

    state
        .registry
        .source_health(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("source {}", id)))
}

/// Build source catalog routes
pub fn source_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sources", get(list_sources))
        .route("/api/sources/:id/toggle", post(toggle_source))
}
