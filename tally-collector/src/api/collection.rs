//! Collection control endpoints
//!
//! Start/stop the scheduled loop, inspect it, and trigger one-off cycles.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tally_common::models::SystemStatus;
use tracing::info;

use crate::scheduler::{CollectorStats, CycleReport};
use crate::store::documents;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub collecting: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatusResponse {
    pub collector: CollectorStats,
    /// Persisted status document
    pub status: SystemStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualFetchRequest {
    #[serde(default)]
    pub max_sources: Option<usize>,
    #[serde(default)]
    pub division: Option<String>,
}

/// POST /api/collection/start
pub async fn start_collection(
    State(state): State<AppState>,
) -> ApiResult<Json<CollectionResponse>> {
    state.scheduler.start().await?;
    info!("Collection started via API");
    Ok(Json(CollectionResponse {
        collecting: true,
        message: "Collection started".to_string(),
    }))
}

/// POST /api/collection/stop
pub async fn stop_collection(
    State(state): State<AppState>,
) -> ApiResult<Json<CollectionResponse>> {
    state.scheduler.stop().await?;
    info!("Collection stopped via API");
    Ok(Json(CollectionResponse {
        collecting: false,
        message: "Collection stopped".to_string(),
    }))
}

/// GET /api/collection/status
pub async fn collection_status(
    State(state): State<AppState>,
) -> ApiResult<Json<CollectionStatusResponse>> {
    let status = match state.store.document(documents::STATUS).await? {
        Some(doc) => serde_json::from_value(doc).map_err(tally_common::Error::from)?,
        None => SystemStatus::default(),
    };

    Ok(Json(CollectionStatusResponse {
        collector: state.scheduler.stats().await,
        status,
    }))
}

/// POST /api/collection/fetch
///
/// Body (optional): `{"maxSources": 3, "division": "Rajshahi"}`
pub async fn manual_fetch(
    State(state): State<AppState>,
    body: Option<Json<ManualFetchRequest>>,
) -> ApiResult<Json<CycleReport>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    match state
        .scheduler
        .manual_fetch(request.max_sources, request.division)
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            state.record_error(format!("Manual fetch failed: {}", e)).await;
            Err(e.into())
        }
    }
}

/// Build collection control routes
pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/collection/start", post(start_collection))
        .route("/api/collection/stop", post(stop_collection))
        .route("/api/collection/status", get(collection_status))
        .route("/api/collection/fetch", post(manual_fetch))
}
