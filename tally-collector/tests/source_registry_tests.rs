//! Source registry integration tests: rotation, isolation, health

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{results_json, ScriptedExtractor};
use tally_collector::sources::{default_catalog, FailureKind, FetchOptions, SourceRegistry};

const EC: &str = "Search the Bangladesh Election Commission";
const BDNEWS: &str = "Search bdnews24.com";
const DAILY_STAR: &str = "Search thedailystar.net";
const PROTHOM_ALO: &str = "Search prothomalo.com";
const TRIBUNE: &str = "Search dhakatribune.com";
const INTERNATIONAL: &str = "Search international news media";

const ALL: [&str; 6] = [EC, BDNEWS, DAILY_STAR, PROTHOM_ALO, TRIBUNE, INTERNATIONAL];

fn registry(extractor: Arc<ScriptedExtractor>) -> SourceRegistry {
    SourceRegistry::with_catalog(extractor, default_catalog(), Duration::from_millis(200))
}

#[tokio::test]
async fn test_rotation_visits_every_source() {
    // Given 6 active sources fetched 2 at a time
    let extractor = Arc::new(ScriptedExtractor::new());
    let registry = registry(Arc::clone(&extractor));

    // When fetching ceil(6/2) = 3 times
    for _ in 0..3 {
        let batch = registry
            .fetch_from_multiple_sources(2, FetchOptions::default())
            .await;
        assert_eq!(batch.attempted.len(), 2);
    }

    // Then every source was asked exactly once
    for needle in ALL {
        assert_eq!(extractor.calls_matching(needle), 1, "{}", needle);
    }
}

#[tokio::test]
async fn test_rotation_continues_across_calls() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let registry = registry(Arc::clone(&extractor));

    let first = registry
        .fetch_from_multiple_sources(4, FetchOptions::default())
        .await;
    let second = registry
        .fetch_from_multiple_sources(4, FetchOptions::default())
        .await;

    assert_eq!(first.attempted, ["ec-bss", "bdnews24", "daily-star", "prothom-alo"]);
    assert_eq!(second.attempted, ["dhaka-tribune", "international", "ec-bss", "bdnews24"]);
}

#[tokio::test]
async fn test_inactive_sources_are_skipped() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let registry = registry(Arc::clone(&extractor));

    assert!(registry.toggle_source("bdnews24", false).await);
    assert!(!registry.toggle_source("no-such-source", false).await);

    let batch = registry
        .fetch_from_multiple_sources(10, FetchOptions::default())
        .await;

    assert_eq!(batch.attempted.len(), 5);
    assert!(!batch.attempted.iter().any(|id| id == "bdnews24"));
    assert_eq!(extractor.calls_matching(BDNEWS), 0);
    assert_eq!(registry.active_count().await, 5);
    assert_eq!(registry.summary().await.active_sources, 5);
}

#[tokio::test]
async fn test_no_active_sources_yields_empty_batch() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let registry = registry(Arc::clone(&extractor));
    for config in registry.configs().await {
        registry.toggle_source(&config.id, false).await;
    }

    let batch = registry
        .fetch_from_multiple_sources(3, FetchOptions::default())
        .await;

    assert!(batch.attempted.is_empty());
    assert!(extractor.calls().is_empty());
}

#[tokio::test]
async fn test_failures_stay_with_their_source() {
    // Given one source that errors, one that answers prose, one that hangs
    let extractor = Arc::new(
        ScriptedExtractor::new()
            .fail(BDNEWS, "connection reset")
            .respond(PROTHOM_ALO, "Sorry, I could not find any results.")
            .hang(TRIBUNE)
            .respond(
                DAILY_STAR,
                results_json(&[(5, 50_000, "bnp", "counting")], &["thedailystar.net"]),
            ),
    );
    let registry = registry(Arc::clone(&extractor));

    // When all six are fetched together
    let batch = registry
        .fetch_from_multiple_sources(6, FetchOptions::default())
        .await;

    // Then siblings still deliver
    assert_eq!(batch.attempted.len(), 6);
    assert_eq!(batch.reports.len(), 1);
    assert_eq!(batch.reports[0].source_id, "daily-star");
    assert_eq!(batch.reports[0].constituency.number, 5);

    assert_eq!(batch.failures.len(), 3);
    let kind_of = |id: &str| {
        batch
            .failures
            .iter()
            .find(|f| f.source_id == id)
            .map(|f| f.kind)
    };
    assert_eq!(kind_of("bdnews24"), Some(FailureKind::Fetch));
    assert_eq!(kind_of("prothom-alo"), Some(FailureKind::Parse));
    assert_eq!(kind_of("dhaka-tribune"), Some(FailureKind::Fetch));

    // And only the failing sources count errors
    for health in registry.health().await {
        assert_eq!(health.fetch_count, 1);
        let expected_errors = match health.id.as_str() {
            "bdnews24" | "prothom-alo" | "dhaka-tribune" => 1,
            _ => 0,
        };
        assert_eq!(health.error_count, expected_errors, "{}", health.id);
    }

    let star = registry.source_health("daily-star").await.unwrap();
    assert_eq!(star.success_count, 1);
    assert_eq!(star.constituencies_reported, 1);
    assert!(star.last_error.is_none());

    let summary = registry.summary().await;
    assert_eq!(summary.total_fetches, 6);
    assert_eq!(summary.total_errors, 3);
}

#[tokio::test]
async fn test_citations_fall_back_to_source_domain() {
    let extractor = Arc::new(ScriptedExtractor::new().respond(
        EC,
        r#"{"results": [{"constituencyNumber": 9, "totalVotes": 1000}]}"#,
    ));
    let registry = registry(Arc::clone(&extractor));

    let batch = registry
        .fetch_from_multiple_sources(1, FetchOptions::default())
        .await;

    assert_eq!(batch.reports.len(), 1);
    assert_eq!(batch.reports[0].sources_used, ["ec.org.bd / bssnews.net"]);
}

#[tokio::test]
async fn test_division_scope_reaches_instruction() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let registry = registry(Arc::clone(&extractor));

    registry
        .fetch_from_multiple_sources(
            1,
            FetchOptions {
                division: Some("Sylhet".to_string()),
            },
        )
        .await;

    let calls = extractor.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("Sylhet division"));
}
