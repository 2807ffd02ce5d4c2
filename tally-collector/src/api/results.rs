//! Published result endpoints: constituencies, summary and ticker

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tally_common::models::{ConstituencyRecord, ElectionSummary, ElectionUpdate};

use crate::store::{documents, UPDATE_FEED_LIMIT};
use crate::summary;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/constituencies
pub async fn list_constituencies(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ConstituencyRecord>>> {
    Ok(Json(state.resolver.canonical_records().await?))
}

/// GET /api/constituencies/:number
pub async fn get_constituency(
    State(state): State<AppState>,
    Path(number): Path<u32>,
) -> ApiResult<Json<ConstituencyRecord>> {
    state
        .resolver
        .canonical(number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("constituency {}", number)))
}

/// GET /api/summary
///
/// Serves the persisted summary document; before the first cycle has written
/// one, aggregates the canonical records on the fly.
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Json<ElectionSummary>> {
    if let Some(doc) = state.store.document(documents::SUMMARY).await? {
        let summary: ElectionSummary =
            serde_json::from_value(doc).map_err(tally_common::Error::from)?;
        return Ok(Json(summary));
    }

    let records = state.resolver.canonical_records().await?;
    Ok(Json(summary::aggregate(
        &records,
        state.scheduler.current_phase(),
    )))
}

/// GET /api/updates?limit=N
pub async fn list_updates(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<ElectionUpdate>>> {
    let limit = query.limit.unwrap_or(UPDATE_FEED_LIMIT).min(UPDATE_FEED_LIMIT);
    Ok(Json(state.store.recent_updates(limit).await?))
}

/// Build published result routes
pub fn result_routes() -> Router<AppState> {
    Router::new()
        .route("/api/constituencies", get(list_constituencies))
        .route("/api/constituencies/:number", get(get_constituency))
        .route("/api/summary", get(get_summary))
        .route("/api/updates", get(list_updates))
}
