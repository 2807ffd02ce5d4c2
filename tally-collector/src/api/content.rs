//! News, referendum and system-error endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tally_common::models::{NewsItem, ReferendumState, SystemError, SystemErrorStatus};
use tracing::info;

use crate::admin::{self, ManualNewsInput, ReferendumInput};
use crate::news::{NewsCollectionResult, NewsCollectorStats};
use crate::store::{documents, NEWS_FEED_LIMIT};
use crate::{ApiError, ApiResult, AppState};

const ERROR_FEED_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AutoNewsRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub items: Vec<NewsItem>,
    pub collector: NewsCollectorStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorStatusResponse {
    pub id: String,
    pub status: SystemErrorStatus,
}

/// GET /api/news?limit=N
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<NewsResponse>> {
    let limit = query.limit.unwrap_or(NEWS_FEED_LIMIT).min(NEWS_FEED_LIMIT);
    Ok(Json(NewsResponse {
        items: state.store.recent_news(limit).await?,
        collector: state.news.stats().await,
    }))
}

/// POST /api/news
pub async fn add_news(
    State(state): State<AppState>,
    Json(input): Json<ManualNewsInput>,
) -> ApiResult<Json<NewsItem>> {
    Ok(Json(admin::add_manual_news(state.store.as_ref(), input).await?))
}

/// POST /api/news/collect
///
/// Runs one news pass now; subject to the collector cooldown.
pub async fn collect_news(
    State(state): State<AppState>,
) -> ApiResult<Json<NewsCollectionResult>> {
    Ok(Json(state.news.collect().await?))
}

/// POST /api/news/auto
pub async fn set_auto_news(
    State(state): State<AppState>,
    Json(request): Json<AutoNewsRequest>,
) -> Json<NewsCollectorStats> {
    state.news.set_enabled(request.enabled);
    info!(enabled = request.enabled, "Automatic news collection toggled");
    Json(state.news.stats().await)
}

/// GET /api/referendum
pub async fn get_referendum(State(state): State<AppState>) -> ApiResult<Json<ReferendumState>> {
    let referendum = match state.store.document(documents::REFERENDUM).await? {
        Some(doc) => serde_json::from_value(doc).map_err(tally_common::Error::from)?,
        None => ReferendumState::default(),
    };
    Ok(Json(referendum))
}

/// POST /api/referendum
pub async fn update_referendum(
    State(state): State<AppState>,
    Json(input): Json<ReferendumInput>,
) -> ApiResult<Json<ReferendumState>> {
    Ok(Json(
        admin::update_referendum(state.store.as_ref(), input).await?,
    ))
}

/// GET /api/errors?limit=N
pub async fn list_errors(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<SystemError>>> {
    let limit = query.limit.unwrap_or(ERROR_FEED_LIMIT);
    Ok(Json(state.store.active_system_errors(limit).await?))
}

/// POST /api/errors/:id/resolve
pub async fn resolve_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ErrorStatusResponse>> {
    let status = SystemErrorStatus::Resolved;
    if !state.store.set_system_error_status(&id, status).await? {
        return Err(ApiError::NotFound(format!("system error {}", id)));
    }
    Ok(Json(ErrorStatusResponse { id, status }))
}

/// Build news, referendum and error-log routes
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/news", get(list_news).post(add_news))
        .route("/api/news/collect", post(collect_news))
        .route("/api/news/auto", post(set_auto_news))
        .route(
            "/api/referendum",
            get(get_referendum).post(update_referendum),
        )
        .route("/api/errors", get(list_errors))
        .route("/api/errors/:id/resolve", post(resolve_error))
}
