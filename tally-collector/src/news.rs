//! Automatic news collection
//!
//! Asks the extractor for the latest election headlines, drops blanks and
//! headlines already seen (compared after normalization), and appends the rest
//! to the news feed. Passes are rate limited by a cooldown.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tally_common::models::{new_id, NewsCategory, NewsItem};
use tally_common::time::now_millis;
use tally_common::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::extract::{parse_news_envelope, TextExtractor};
use crate::store::ElectionStore;

pub const NEWS_COOLDOWN: Duration = Duration::from_secs(120);

/// Remembered headline digests before the oldest are evicted
const MAX_SEEN_HEADLINES: usize = 500;
const SEEN_EVICTION_BATCH: usize = 100;

const NEWS_INSTRUCTION: &str = "You are a news aggregator for the Bangladesh 13th National \
Parliament Election. Search for the latest election news, updates and breaking developments from \
major Bangladesh and international outlets (bdnews24.com, The Daily Star, Prothom Alo, Dhaka \
Tribune, NDTV, India Today, Al Jazeera, BBC). Focus on result declarations, turnout updates, \
irregularities or incidents, party reactions, referendum updates and analysis. Only include \
verified news from reliable sources, at most 10 items.";

const NEWS_SCHEMA: &str = r#"Return news in this exact JSON format:
{
  "news": [
    {
      "headline": "<headline>",
      "summary": "<2-3 sentence summary>",
      "source": "<source name>",
      "sourceUrl": "<url>",
      "category": "breaking" | "result" | "analysis" | "incident" | "general",
      "importance": "high" | "medium" | "low"
    }
  ]
}"#;

const DEFAULT_NEWS_SOURCE: &str = "Auto-collected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCollectionResult {
    pub success: bool,
    pub items_added: usize,
    pub items_skipped: usize,
    pub message: String,
}

impl NewsCollectionResult {
    fn not_run(message: impl Into<String>) -> Self {
        Self {
            success: false,
            items_added: 0,
            items_skipped: 0,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCollectorStats {
    pub auto_enabled: bool,
    pub last_fetch_time: Option<i64>,
    pub total_auto_fetched: u64,
    pub seen_headlines: usize,
    pub cooldown_ms: u64,
}

#[derive(Default)]
struct SeenHeadlines {
    order: VecDeque<String>,
    digests: HashSet<String>,
}

impl SeenHeadlines {
    fn contains(&self, digest: &str) -> bool {
        self.digests.contains(digest)
    }

    fn insert(&mut self, digest: String) {
        if !self.digests.insert(digest.clone()) {
            return;
        }
        self.order.push_back(digest);

        if self.order.len() > MAX_SEEN_HEADLINES {
            for evicted in self.order.drain(..SEEN_EVICTION_BATCH) {
                self.digests.remove(&evicted);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

struct NewsState {
    last_fetch: Option<Instant>,
    last_fetch_time: Option<i64>,
    total_auto_fetched: u64,
    seen: SeenHeadlines,
}

pub struct NewsCollector {
    store: Arc<dyn ElectionStore>,
    extractor: Arc<dyn TextExtractor>,
    enabled: AtomicBool,
    cooldown: Duration,
    state: Mutex<NewsState>,
}

impl NewsCollector {
    pub fn new(store: Arc<dyn ElectionStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self::with_cooldown(store, extractor, NEWS_COOLDOWN)
    }

    pub fn with_cooldown(
        store: Arc<dyn ElectionStore>,
        extractor: Arc<dyn TextExtractor>,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            extractor,
            enabled: AtomicBool::new(true),
            cooldown,
            state: Mutex::new(NewsState {
                last_fetch: None,
                last_fetch_time: None,
                total_auto_fetched: 0,
                seen: SeenHeadlines::default(),
            }),
        }
    }

    /// Run one news pass
    ///
    /// Extraction and parse failures come back as an unsuccessful result; only
    /// persistence failures are errors.
    pub async fn collect(&self) -> Result<NewsCollectionResult> {
        if !self.is_enabled() {
            return Ok(NewsCollectionResult::not_run("Auto-news disabled"));
        }

        let mut state = self.state.lock().await;
        if let Some(last) = state.last_fetch {
            let since = last.elapsed();
            if since < self.cooldown {
                let remaining = (self.cooldown - since).as_secs_f64().ceil() as u64;
                return Ok(NewsCollectionResult::not_run(format!(
                    "Cooldown: {}s remaining",
                    remaining
                )));
            }
        }
        state.last_fetch = Some(Instant::now());
        state.last_fetch_time = Some(now_millis());

        let extracted = match self.extractor.extract(NEWS_INSTRUCTION, NEWS_SCHEMA).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(error = %e, "News extraction failed");
                return Ok(NewsCollectionResult::not_run(format!("Error: {}", e)));
            }
        };

        let raw_items = match parse_news_envelope(&extracted.text) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "News answer could not be parsed");
                return Ok(NewsCollectionResult {
                    success: true,
                    items_added: 0,
                    items_skipped: 0,
                    message: "No new news items found".to_string(),
                });
            }
        };

        let mut added = 0;
        let mut skipped = 0;
        for raw in raw_items {
            let digest = headline_digest(&raw.headline);
            let Some(digest) = digest.filter(|d| !state.seen.contains(d)) else {
                skipped += 1;
                continue;
            };

            let item = NewsItem {
                id: new_id(),
                headline: raw.headline,
                summary: raw.summary,
                source: if raw.source.is_empty() {
                    DEFAULT_NEWS_SOURCE.to_string()
                } else {
                    raw.source
                },
                source_url: raw.source_url,
                timestamp: now_millis(),
                category: NewsCategory::parse_lenient(&raw.category),
                is_verified: raw.importance.eq_ignore_ascii_case("high"),
            };
            self.store.add_news(&item).await?;
            state.seen.insert(digest);
            added += 1;
            state.total_auto_fetched += 1;
        }

        info!(added, skipped, "News pass complete");
        Ok(NewsCollectionResult {
            success: true,
            items_added: added,
            items_skipped: skipped,
            message: format!("Collected {} news items", added),
        })
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "Auto-news toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub async fn stats(&self) -> NewsCollectorStats {
        let state = self.state.lock().await;
        NewsCollectorStats {
            auto_enabled: self.is_enabled(),
            last_fetch_time: state.last_fetch_time,
            total_auto_fetched: state.total_auto_fetched,
            seen_headlines: state.seen.len(),
            cooldown_ms: self.cooldown.as_millis() as u64,
        }
    }
}

/// Lowercase, punctuation stripped, whitespace collapsed
pub fn normalize_headline(headline: &str) -> String {
    headline
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 of the normalized headline, `None` for blank headlines
fn headline_digest(headline: &str) -> Option<String> {
    let normalized = normalize_headline(headline);
    if normalized.is_empty() {
        return None;
    }
    Some(format!("{:x}", Sha256::digest(normalized.as_bytes())))
}
