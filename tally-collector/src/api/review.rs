//! Operator review endpoints
//!
//! Conflict resolution, the pending-update queue, manual overrides, catalog
//! re-seeding and the audit trail.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tally_common::catalog::seed_constituencies;
use tally_common::models::{
    AuditEntry, Candidate, ConstituencyRecord, ConstituencyStatus, DataConflict, PendingUpdate,
};
use tracing::info;

use crate::trust::{trust_label, TrustLabel};
use crate::{ApiError, ApiResult, AppState};

const DEFAULT_AUDIT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ResolveConflictRequest {
    pub resolution: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingView {
    #[serde(flatten)]
    pub update: PendingUpdate,
    pub trust_label: TrustLabel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub status: ConstituencyStatus,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub seeded: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub constituency_id: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/conflicts
pub async fn list_conflicts(State(state): State<AppState>) -> ApiResult<Json<Vec<DataConflict>>> {
    Ok(Json(state.store.conflicts().await?))
}

/// POST /api/conflicts/:id/resolve
pub async fn resolve_conflict(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResolveConflictRequest>,
) -> ApiResult<Json<DataConflict>> {
    let resolution = request.resolution.trim();
    if resolution.is_empty() {
        return Err(ApiError::BadRequest("resolution must not be empty".to_string()));
    }
    Ok(Json(state.resolver.resolve_conflict(&id, resolution).await?))
}

/// GET /api/pending
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<PendingView>>> {
    let pending = state
        .store
        .pending_updates()
        .await?
        .into_iter()
        .map(|update| PendingView {
            trust_label: trust_label(update.trust_score),
            update,
        })
        .collect();
    Ok(Json(pending))
}

/// POST /api/pending/:id/approve
pub async fn approve_pending(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConstituencyRecord>> {
    Ok(Json(state.resolver.approve_pending_update(&id).await?))
}

/// POST /api/pending/:id/reject
pub async fn reject_pending(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewResponse>> {
    state.resolver.reject_pending_update(&id).await?;
    Ok(Json(ReviewResponse {
        id,
        status: "rejected".to_string(),
    }))
}

/// POST /api/constituencies/:number/override
pub async fn override_constituency(
    State(state): State<AppState>,
    Path(number): Path<u32>,
    Json(request): Json<OverrideRequest>,
) -> ApiResult<Json<ConstituencyRecord>> {
    Ok(Json(
        state
            .resolver
            .admin_override(number, request.status, request.candidates)
            .await?,
    ))
}

/// POST /api/admin/seed
///
/// Replaces every canonical record with the static catalog.
pub async fn seed(State(state): State<AppState>) -> ApiResult<Json<SeedResponse>> {
    let seeded = state.resolver.reseed(seed_constituencies()).await?;
    info!(seeded, "Catalog re-seeded via API");
    Ok(Json(SeedResponse { seeded }))
}

/// GET /api/audit?constituencyId=...&limit=N
pub async fn audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Ok(Json(
        state
            .store
            .audit_log(query.constituency_id.as_deref(), limit)
            .await?,
    ))
}

/// Build operator review routes
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/conflicts", get(list_conflicts))
        .route("/api/conflicts/:id/resolve", post(resolve_conflict))
        .route("/api/pending", get(list_pending))
        .route("/api/pending/:id/approve", post(approve_pending))
        .route("/api/pending/:id/reject", post(reject_pending))
        .route(
            "/api/constituencies/:number/override",
            post(override_constituency),
        )
        .route("/api/admin/seed", post(seed))
        .route("/api/audit", get(audit_log))
}
