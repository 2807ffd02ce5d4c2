//! HTTP Server & Routing Integration Tests
//!
//! Drives the router with `tower::ServiceExt::oneshot` against an in-memory
//! store and a scripted extractor.

mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{results_json, seeded_memory_store, MemoryStore, ScriptedExtractor};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tally_collector::{build_router, AppState, ServiceSettings};
use tally_common::events::EventBus;
use tower::ServiceExt;

fn test_app() -> (Arc<MemoryStore>, Router) {
    let store = seeded_memory_store();
    let extractor = Arc::new(ScriptedExtractor::new().respond(
        "Search the Bangladesh Election Commission",
        results_json(&[(8, 70_000, "bnp", "counting")], &["ec.org.bd", "bssnews.net"]),
    ));
    let state = AppState::new(
        store.clone(),
        EventBus::new(100),
        extractor,
        ServiceSettings::default(),
    );
    (store, build_router(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_store, app) = test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tally-collector");
    assert_eq!(body["collecting"], false);
}

#[tokio::test]
async fn test_constituency_listing_and_lookup() {
    let (_store, app) = test_app();

    let (status, body) = send(&app, "GET", "/api/constituencies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 300);
    assert_eq!(body[0]["number"], 1);

    let (status, body) = send(&app, "GET", "/api/constituencies/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_started");

    let (status, body) = send(&app, "GET", "/api/constituencies/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_summary_falls_back_to_live_aggregate() {
    let (_store, app) = test_app();

    let (status, body) = send(&app, "GET", "/api/summary", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 300);
    assert_eq!(body["seatsDeclared"], 0);
    assert_eq!(body["leadingParty"], Value::Null);
}

#[tokio::test]
async fn test_override_then_audit_trail() {
    let (_store, app) = test_app();

    let (status, record) = send(
        &app,
        "POST",
        "/api/constituencies/30/override",
        Some(json!({
            "status": "declared",
            "candidates": [
                { "name": "B", "party": "jamaat", "votes": 20000 },
                { "name": "A", "party": "bnp", "votes": 30000 }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["trustScore"], 100);
    assert_eq!(record["source"], "admin_override");
    assert_eq!(record["candidates"][0]["party"], "bnp");
    assert_eq!(record["candidates"][0]["isWinner"], true);

    let uri = format!("/api/audit?constituencyId={}", record["id"].as_str().unwrap());
    let (status, audit) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit[0]["action"], "manual_override");

    let (status, _) = send(
        &app,
        "POST",
        "/api/constituencies/0/override",
        Some(json!({ "status": "counting", "candidates": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_endpoints_report_missing_ids() {
    let (_store, app) = test_app();

    let (status, _) = send(&app, "POST", "/api/pending/nope/approve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/pending/nope/reject", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/conflicts/nope/resolve",
        Some(json!({ "resolution": "checked" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/conflicts/nope/resolve",
        Some(json!({ "resolution": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_fetch_publishes_and_updates_ticker() {
    let (_store, app) = test_app();

    let (status, report) = send(
        &app,
        "POST",
        "/api/collection/fetch",
        Some(json!({ "maxSources": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cycle"], 1);
    assert_eq!(report["sourcesAttempted"], json!(["ec-bss"]));
    assert_eq!(report["resolution"]["published"], 1);

    let (_, record) = send(&app, "GET", "/api/constituencies/8", None).await;
    assert_eq!(record["totalVotes"], 70_000);

    let (_, updates) = send(&app, "GET", "/api/updates?limit=5", None).await;
    assert_eq!(updates.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/api/collection/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["apiCallsToday"], 1);
    assert_eq!(body["collector"]["cycles"], 1);
}

#[tokio::test]
async fn test_source_toggle() {
    let (_store, app) = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/sources/bdnews24/toggle",
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/sources/unknown/toggle",
        Some(json!({ "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listing) = send(&app, "GET", "/api/sources", None).await;
    assert_eq!(listing["sources"].as_array().unwrap().len(), 6);
    assert_eq!(listing["summary"]["activeSources"], 5);
}

#[tokio::test]
async fn test_referendum_and_news_entry() {
    let (_store, app) = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/referendum",
        Some(json!({ "totalYes": 1, "totalNo": 1, "centersReported": 5, "totalCenters": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/referendum",
        Some(json!({ "totalYes": 600, "totalNo": 400, "status": "counting" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["percentYes"], 60.0);

    let (_, stored) = send(&app, "GET", "/api/referendum", None).await;
    assert_eq!(stored["totalCast"], 1000);

    let (status, _) = send(&app, "POST", "/api/news", Some(json!({ "headline": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, item) = send(
        &app,
        "POST",
        "/api/news",
        Some(json!({ "headline": "Counting resumes in Sylhet" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["source"], "Admin");
    assert_eq!(item["isVerified"], true);

    let (_, news) = send(&app, "GET", "/api/news", None).await;
    assert_eq!(news["items"].as_array().unwrap().len(), 1);

    let (status, stats) = send(&app, "POST", "/api/news/auto", Some(json!({ "enabled": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["autoEnabled"], false);
}

#[tokio::test]
async fn test_error_log_and_reseed() {
    let (_store, app) = test_app();

    let (status, errors) = send(&app, "GET", "/api/errors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(errors.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "POST", "/api/errors/nope/resolve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/api/admin/seed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seeded"], 300);
}
