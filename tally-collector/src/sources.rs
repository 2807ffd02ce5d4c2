//! Source registry
//!
//! Catalog of result sources, the rotation over the active ones, concurrent
//! fan-out through the [`TextExtractor`], and per-source health bookkeeping.
//! A failing source never affects its siblings: every fetch settles on its own
//! and failures come back alongside the successful reports.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tally_common::models::{SourceHealth, SourceReport, SourceTier};
use tally_common::time::now_millis;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::extract::{parse_results_envelope, TextExtractor};

/// Reply format requested from every source
pub const RESULT_SCHEMA: &str = r#"Return results in this exact JSON format:
{
  "results": [
    {
      "constituencyNumber": <number>,
      "constituencyName": "<name>",
      "division": "<division>",
      "district": "<district>",
      "status": "counting" | "declared" | "result_confirmed",
      "candidates": [
        {
          "name": "<candidate name>",
          "partyId": "bnp" | "jamaat" | "jp-ershad" | "gonoforum" | "jasod" | "workers-party" | "islami-andolan" | "ncp" | "ldp" | "independent" | "others",
          "votes": <number>,
          "isWinner": <boolean>,
          "isLeading": <boolean>
        }
      ],
      "totalVotes": <number>,
      "winMargin": <number>
    }
  ],
  "sourcesUsed": ["<source1>", "<source2>"],
  "confidenceLevel": "high" | "medium" | "low"
}
Only include data you are confident about."#;

/// Static description of one source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub tier: SourceTier,
    pub domain: String,
    pub instruction: String,
}

impl SourceConfig {
    pub fn new(id: &str, name: &str, tier: SourceTier, domain: &str, instruction: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tier,
            domain: domain.to_string(),
            instruction: instruction.to_string(),
        }
    }
}

/// Built-in source catalog
pub fn default_catalog() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "ec-bss",
            "EC / BSS (Official)",
            SourceTier::Official,
            "ec.org.bd / bssnews.net",
            "Search the Bangladesh Election Commission (ec.org.bd) and Bangladesh Sangbad Sangstha \
             (bssnews.net) for the latest official 13th National Parliament Election results. \
             Include officially declared constituencies only.",
        ),
        SourceConfig::new(
            "bdnews24",
            "bdnews24.com",
            SourceTier::MajorPress,
            "bdnews24.com",
            "Search bdnews24.com for the latest 13th National Parliament Election results. Include \
             constituency-level vote counts, winner declarations and leading candidates.",
        ),
        SourceConfig::new(
            "daily-star",
            "The Daily Star",
            SourceTier::MajorPress,
            "thedailystar.net",
            "Search thedailystar.net for the latest 13th National Parliament Election results. \
             Include constituency results, vote counts and any winner declarations.",
        ),
        SourceConfig::new(
            "prothom-alo",
            "Prothom Alo",
            SourceTier::MajorPress,
            "prothomalo.com",
            "Search prothomalo.com for the latest 13th National Parliament Election results. \
             Include constituency results, vote counts and leading candidates.",
        ),
        SourceConfig::new(
            "dhaka-tribune",
            "Dhaka Tribune",
            SourceTier::MajorPress,
            "dhakatribune.com",
            "Search dhakatribune.com for the latest 13th National Parliament Election results. \
             Include constituency results and vote tallies.",
        ),
        SourceConfig::new(
            "international",
            "International Media",
            SourceTier::International,
            "ndtv.com / indiatoday.in / aljazeera.com",
            "Search international news media (NDTV, India Today, Al Jazeera, BBC) for the latest \
             Bangladesh 13th National Parliament Election results. Include any constituency-level \
             results.",
        ),
    ]
}

/// Options for one multi-source fetch
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Restrict the request to one division
    pub division: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport, API or timeout failure
    Fetch,
    /// Answer received but not usable
    Parse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source_id: String,
    pub source_name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one multi-source fetch
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    pub reports: Vec<SourceReport>,
    pub failures: Vec<SourceFailure>,
    /// Ids of the sources asked, in rotation order
    pub attempted: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub total_sources: usize,
    pub active_sources: usize,
    pub total_fetches: u64,
    pub total_errors: u64,
    pub total_constituencies: usize,
}

struct SourceEntry {
    config: SourceConfig,
    health: SourceHealth,
}

struct RegistryState {
    entries: Vec<SourceEntry>,
    cursor: usize,
}

pub struct SourceRegistry {
    extractor: Arc<dyn TextExtractor>,
    fetch_timeout: Duration,
    state: RwLock<RegistryState>,
}

impl SourceRegistry {
    pub fn new(extractor: Arc<dyn TextExtractor>, fetch_timeout: Duration) -> Self {
        Self::with_catalog(extractor, default_catalog(), fetch_timeout)
    }

    pub fn with_catalog(
        extractor: Arc<dyn TextExtractor>,
        catalog: Vec<SourceConfig>,
        fetch_timeout: Duration,
    ) -> Self {
        let entries = catalog
            .into_iter()
            .map(|config| SourceEntry {
                health: SourceHealth {
                    id: config.id.clone(),
                    name: config.name.clone(),
                    tier: config.tier,
                    is_active: true,
                    last_fetch_time: None,
                    last_success_time: None,
                    fetch_count: 0,
                    success_count: 0,
                    error_count: 0,
                    constituencies_reported: 0,
                    avg_response_ms: 0.0,
                    last_error: None,
                },
                config,
            })
            .collect();

        Self {
            extractor,
            fetch_timeout,
            state: RwLock::new(RegistryState { entries, cursor: 0 }),
        }
    }

    /// Fetch from up to `max_sources` active sources, continuing the rotation
    pub async fn fetch_from_multiple_sources(
        &self,
        max_sources: usize,
        options: FetchOptions,
    ) -> FetchBatch {
        let selected = self.select(max_sources).await;
        if selected.is_empty() {
            debug!("No active sources to fetch from");
            return FetchBatch::default();
        }

        info!(
            sources = ?selected.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            division = options.division.as_deref().unwrap_or("all"),
            "Fetching from sources"
        );

        let attempted = selected.iter().map(|c| c.id.clone()).collect();
        let outcomes = join_all(
            selected
                .iter()
                .map(|config| self.fetch_one(config, options.division.as_deref())),
        )
        .await;

        let mut batch = FetchBatch {
            attempted,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(reports) => batch.reports.extend(reports),
                Err(failure) => batch.failures.push(failure),
            }
        }
        batch
    }

    async fn select(&self, max_sources: usize) -> Vec<SourceConfig> {
        let mut state = self.state.write().await;
        let active: Vec<SourceConfig> = state
            .entries
            .iter()
            .filter(|e| e.health.is_active)
            .map(|e| e.config.clone())
            .collect();
        if active.is_empty() || max_sources == 0 {
            return Vec::new();
        }

        let start = state.cursor % active.len();
        let selected = (0..max_sources.min(active.len()))
            .map(|i| active[(start + i) % active.len()].clone())
            .collect();
        state.cursor = (start + max_sources) % active.len();
        selected
    }

    async fn fetch_one(
        &self,
        config: &SourceConfig,
        division: Option<&str>,
    ) -> Result<Vec<SourceReport>, SourceFailure> {
        self.record_attempt(&config.id).await;
        let started = Instant::now();

        let instruction = instruction_for(config, division);
        let extracted = match tokio::time::timeout(
            self.fetch_timeout,
            self.extractor.extract(&instruction, RESULT_SCHEMA),
        )
        .await
        {
            Ok(Ok(extracted)) => extracted,
            Ok(Err(e)) => return Err(self.fail(config, FailureKind::Fetch, e.to_string()).await),
            Err(_) => {
                let message = format!("timed out after {}s", self.fetch_timeout.as_secs());
                return Err(self.fail(config, FailureKind::Fetch, message).await);
            }
        };

        let envelope = match parse_results_envelope(&extracted.text) {
            Ok(envelope) => envelope,
            Err(e) => return Err(self.fail(config, FailureKind::Parse, e.to_string()).await),
        };

        let sources_used = if !envelope.sources_used.is_empty() {
            envelope.sources_used
        } else if !extracted.citations.is_empty() {
            extracted.citations
        } else {
            vec![config.domain.clone()]
        };

        let fetched_at = now_millis();
        let reports: Vec<SourceReport> = envelope
            .results
            .into_iter()
            .map(|constituency| SourceReport {
                source_id: config.id.clone(),
                source_name: config.name.clone(),
                tier: config.tier,
                constituency,
                confidence: envelope.confidence,
                sources_used: sources_used.clone(),
                fetched_at,
            })
            .collect();

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.record_success(&config.id, reports.len(), elapsed_ms).await;
        info!(
            source = %config.id,
            constituencies = reports.len(),
            dropped = envelope.dropped,
            elapsed_ms = elapsed_ms as u64,
            "Source fetch complete"
        );
        Ok(reports)
    }

    async fn record_attempt(&self, id: &str) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.iter_mut().find(|e| e.config.id == id) {
            entry.health.fetch_count += 1;
            entry.health.last_fetch_time = Some(now_millis());
        }
    }

    async fn record_success(&self, id: &str, constituencies: usize, elapsed_ms: f64) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.iter_mut().find(|e| e.config.id == id) {
            let health = &mut entry.health;
            health.success_count += 1;
            health.last_success_time = Some(now_millis());
            health.constituencies_reported = constituencies;
            health.avg_response_ms = rolling_latency(health.avg_response_ms, elapsed_ms);
            health.last_error = None;
        }
    }

    async fn fail(&self, config: &SourceConfig, kind: FailureKind, message: String) -> SourceFailure {
        warn!(source = %config.id, kind = ?kind, error = %message, "Source fetch failed");

        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.iter_mut().find(|e| e.config.id == config.id) {
            entry.health.error_count += 1;
            entry.health.last_error = Some(message.clone());
        }

        SourceFailure {
            source_id: config.id.clone(),
            source_name: config.name.clone(),
            kind,
            message,
        }
    }

    /// Returns false for an unknown source id
    pub async fn toggle_source(&self, id: &str, active: bool) -> bool {
        let mut state = self.state.write().await;
        match state.entries.iter_mut().find(|e| e.config.id == id) {
            Some(entry) => {
                entry.health.is_active = active;
                info!(source = %id, active, "Source toggled");
                true
            }
            None => false,
        }
    }

    pub async fn health(&self) -> Vec<SourceHealth> {
        let state = self.state.read().await;
        state.entries.iter().map(|e| e.health.clone()).collect()
    }

    pub async fn source_health(&self, id: &str) -> Option<SourceHealth> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .find(|e| e.config.id == id)
            .map(|e| e.health.clone())
    }

    pub async fn configs(&self) -> Vec<SourceConfig> {
        let state = self.state.read().await;
        state.entries.iter().map(|e| e.config.clone()).collect()
    }

    pub async fn active_count(&self) -> usize {
        let state = self.state.read().await;
        state.entries.iter().filter(|e| e.health.is_active).count()
    }

    pub async fn summary(&self) -> SourceSummary {
        let state = self.state.read().await;
        let health = state.entries.iter().map(|e| &e.health);
        SourceSummary {
            total_sources: state.entries.len(),
            active_sources: health.clone().filter(|h| h.is_active).count(),
            total_fetches: health.clone().map(|h| h.fetch_count).sum(),
            total_errors: health.clone().map(|h| h.error_count).sum(),
            total_constituencies: health.map(|h| h.constituencies_reported).sum(),
        }
    }
}

fn instruction_for(config: &SourceConfig, division: Option<&str>) -> String {
    let mut instruction = config.instruction.clone();
    if let Some(division) = division.filter(|d| !d.trim().is_empty()) {
        instruction.push_str(&format!(
            " Focus only on constituencies in the {} division.",
            division.trim()
        ));
    }
    instruction.push_str(
        " Map party names to ids: BNP=\"bnp\", Jamaat-e-Islami=\"jamaat\", \
         Jatiya Party=\"jp-ershad\", National Citizen Party=\"ncp\", Independent=\"independent\".",
    );
    instruction
}

/// Exponential moving average of response time; the first sample is taken as-is
pub fn rolling_latency(previous_ms: f64, sample_ms: f64) -> f64 {
    if previous_ms > 0.0 {
        previous_ms * 0.7 + sample_ms * 0.3
    } else {
        sample_ms
    }
}
