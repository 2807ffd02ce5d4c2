//! Collection scheduler
//!
//! Maps wall-clock time onto the election-day phase model and drives the
//! collection cycle at the cadence of the current phase. The loop runs as one
//! spawned task stopped through a [`CancellationToken`]; cycles (scheduled or
//! manual) never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use serde_json::json;
use tally_common::catalog::{default_voting_end, default_voting_start, TOTAL_SEATS};
use tally_common::config::ElectionConfig;
use tally_common::events::{ElectionEvent, EventBus};
use tally_common::models::{
    new_id, CollectionPhase, SystemError, SystemErrorKind, SystemErrorStatus,
};
use tally_common::time::{now_millis, to_local};
use tally_common::Result;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::news::{NewsCollectionResult, NewsCollector};
use crate::resolver::{ConflictResolver, ResolutionStats};
use crate::sources::{FailureKind, FetchOptions, SourceRegistry};
use crate::store::{documents, ElectionStore};
use crate::summary;

/// Wait before re-checking the phase while collection is disabled
pub const INACTIVE_RECHECK: Duration = Duration::from_secs(60);

/// The news pass runs on the first cycle and every this many cycles after
pub const NEWS_EVERY_N_CYCLES: u64 = 3;

/// Sources asked by the start-up and manual cycles when the phase asks for none
pub const MANUAL_FETCH_SOURCES: usize = 2;

const EARLY_RESULTS_END_HOUR: i64 = 19;
const LATE_RESULTS_END_HOUR: i64 = 24 + 8;
const CLEANUP_HOURS: i64 = 48;

/// Source of "now" for phase classification
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Polling interval for a phase, `None` when collection is disabled
pub fn collection_interval(phase: CollectionPhase) -> Option<Duration> {
    match phase {
        CollectionPhase::EarlyResults | CollectionPhase::PeakResults => {
            Some(Duration::from_secs(60))
        }
        CollectionPhase::LateResults => Some(Duration::from_secs(120)),
        CollectionPhase::Cleanup => Some(Duration::from_secs(600)),
        CollectionPhase::PreVoting | CollectionPhase::Voting | CollectionPhase::Completed => None,
    }
}

/// Sources fetched per scheduled cycle
pub fn sources_per_cycle(phase: CollectionPhase) -> usize {
    match phase {
        CollectionPhase::PeakResults => 3,
        CollectionPhase::EarlyResults | CollectionPhase::LateResults => 2,
        CollectionPhase::Cleanup => 1,
        CollectionPhase::PreVoting | CollectionPhase::Voting | CollectionPhase::Completed => 0,
    }
}

/// Voting window the phase model is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionTimeline {
    pub voting_start: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
}

impl Default for ElectionTimeline {
    fn default() -> Self {
        Self {
            voting_start: default_voting_start(),
            voting_end: default_voting_end(),
        }
    }
}

impl ElectionTimeline {
    pub fn from_config(config: &ElectionConfig) -> Self {
        Self {
            voting_start: config.voting_start.unwrap_or_else(default_voting_start),
            voting_end: config.voting_end.unwrap_or_else(default_voting_end),
        }
    }

    /// Phase at `now`
    ///
    /// Result phases are anchored to local (UTC+6) midnight of the day voting
    /// ends: early results until 19:00, peak until midnight, late until 08:00
    /// the next morning, then 48 hours of cleanup.
    pub fn phase_at(&self, now: DateTime<Utc>) -> CollectionPhase {
        if now < self.voting_start {
            return CollectionPhase::PreVoting;
        }
        if now < self.voting_end {
            return CollectionPhase::Voting;
        }

        let local_end = to_local(self.voting_end);
        let since_midnight = chrono::Duration::seconds(local_end.num_seconds_from_midnight() as i64)
            + chrono::Duration::nanoseconds(local_end.nanosecond() as i64);
        let day_start = self.voting_end - since_midnight;

        let early_end = day_start + chrono::Duration::hours(EARLY_RESULTS_END_HOUR);
        let peak_end = day_start + chrono::Duration::hours(24);
        let late_end = day_start + chrono::Duration::hours(LATE_RESULTS_END_HOUR);
        let cleanup_end = late_end + chrono::Duration::hours(CLEANUP_HOURS);

        if now < early_end {
            CollectionPhase::EarlyResults
        } else if now < peak_end {
            CollectionPhase::PeakResults
        } else if now < late_end {
            CollectionPhase::LateResults
        } else if now < cleanup_end {
            CollectionPhase::Cleanup
        } else {
            CollectionPhase::Completed
        }
    }
}

/// What one cycle did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle: u64,
    pub phase: CollectionPhase,
    pub sources_attempted: Vec<String>,
    pub reports: usize,
    pub failures: usize,
    pub resolution: ResolutionStats,
    pub news: Option<NewsCollectionResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorStats {
    pub is_collecting: bool,
    pub phase: CollectionPhase,
    pub is_active: bool,
    pub interval_secs: u64,
    pub cycles: u64,
    pub api_calls: u64,
    pub errors: u64,
    pub last_cycle_at: Option<i64>,
}

#[derive(Default)]
struct CycleState {
    cycles: u64,
    api_calls: u64,
    errors: u64,
    last_phase: Option<CollectionPhase>,
    last_cycle_at: Option<i64>,
}

pub struct CollectionScheduler {
    store: Arc<dyn ElectionStore>,
    registry: Arc<SourceRegistry>,
    resolver: Arc<ConflictResolver>,
    news: Arc<NewsCollector>,
    events: EventBus,
    timeline: ElectionTimeline,
    clock: Clock,
    running: Mutex<Option<CancellationToken>>,
    /// Held for the whole of a cycle
    cycle: Mutex<CycleState>,
}

impl CollectionScheduler {
    pub fn new(
        store: Arc<dyn ElectionStore>,
        registry: Arc<SourceRegistry>,
        resolver: Arc<ConflictResolver>,
        news: Arc<NewsCollector>,
        events: EventBus,
        timeline: ElectionTimeline,
    ) -> Self {
        Self {
            store,
            registry,
            resolver,
            news,
            events,
            timeline,
            clock: Arc::new(Utc::now),
            running: Mutex::new(None),
            cycle: Mutex::new(CycleState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn current_phase(&self) -> CollectionPhase {
        self.timeline.phase_at((self.clock)())
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Start collecting: flag write, one immediate cycle, then the loop
    ///
    /// Starting a running scheduler only rewrites the flag.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let token = {
            let mut running = self.running.lock().await;
            if running.is_some() {
                info!("Collection already running");
                None
            } else {
                let token = CancellationToken::new();
                *running = Some(token.clone());
                Some(token)
            }
        };

        let phase = self.current_phase();
        let flagged = self
            .store
            .merge_document(
                documents::STATUS,
                json!({
                    "isCollecting": true,
                    "collectionPhase": phase,
                    "seatsTotal": TOTAL_SEATS,
                }),
            )
            .await;
        if let Err(e) = flagged {
            if token.is_some() {
                *self.running.lock().await = None;
            }
            return Err(e);
        }

        let Some(token) = token else {
            return Ok(());
        };

        info!(phase = %phase, "Starting collection");
        let sources = sources_per_cycle(phase).max(MANUAL_FETCH_SOURCES);
        // A failed first cycle is already logged; the loop still starts
        let _ = self.run_logged_cycle(sources, None).await;

        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run_loop(token).await });
        Ok(())
    }

    /// Stop the loop; an in-flight cycle may still complete
    pub async fn stop(&self) -> Result<()> {
        match self.running.lock().await.take() {
            Some(token) => {
                token.cancel();
                info!("Collection stopped");
            }
            None => debug!("Collection was not running"),
        }

        self.store
            .merge_document(documents::STATUS, json!({ "isCollecting": false }))
            .await
    }

    async fn run_loop(self: Arc<Self>, token: CancellationToken) {
        loop {
            let wait = collection_interval(self.current_phase()).unwrap_or(INACTIVE_RECHECK);
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let phase = self.current_phase();
            if collection_interval(phase).is_none() {
                debug!(phase = %phase, "Collection inactive for phase");
                continue;
            }

            let _ = self.run_logged_cycle(sources_per_cycle(phase), None).await;
        }
        info!("Collection loop exited");
    }

    /// One-shot cycle outside the schedule
    pub async fn manual_fetch(
        &self,
        max_sources: Option<usize>,
        division: Option<String>,
    ) -> Result<CycleReport> {
        let sources = max_sources
            .unwrap_or_else(|| sources_per_cycle(self.current_phase()).max(MANUAL_FETCH_SOURCES));
        info!(sources, division = division.as_deref().unwrap_or("all"), "Manual fetch");
        self.run_logged_cycle(sources, division).await
    }

    async fn run_logged_cycle(
        &self,
        max_sources: usize,
        division: Option<String>,
    ) -> Result<CycleReport> {
        let mut state = self.cycle.lock().await;
        let result = self.run_cycle(&mut state, max_sources, division).await;

        if let Err(e) = &result {
            state.errors += 1;
            error!(error = %e, "Collection cycle failed");
            self.log_system_error(
                SystemErrorKind::Other,
                None,
                "Collection cycle failed",
                Some(e.to_string()),
            )
            .await;
        }
        result
    }

    async fn run_cycle(
        &self,
        state: &mut CycleState,
        max_sources: usize,
        division: Option<String>,
    ) -> Result<CycleReport> {
        state.cycles += 1;
        let cycle = state.cycles;
        let phase = self.current_phase();

        if let Some(old_phase) = state.last_phase.filter(|p| *p != phase) {
            info!(old = %old_phase, new = %phase, "Collection phase changed");
            self.events.emit_lossy(ElectionEvent::PhaseChanged {
                old_phase,
                new_phase: phase,
                timestamp: now_millis(),
            });
        }
        state.last_phase = Some(phase);

        debug!(cycle, phase = %phase, max_sources, "Running collection cycle");

        let news = if (cycle - 1) % NEWS_EVERY_N_CYCLES == 0 {
            match self.news.collect().await {
                Ok(result) => Some(result),
                Err(e) => {
                    state.errors += 1;
                    warn!(error = %e, "News pass failed");
                    self.log_system_error(
                        SystemErrorKind::Other,
                        None,
                        "News pass failed",
                        Some(e.to_string()),
                    )
                    .await;
                    None
                }
            }
        } else {
            None
        };

        let batch = self
            .registry
            .fetch_from_multiple_sources(max_sources, FetchOptions { division })
            .await;
        state.api_calls += batch.attempted.len() as u64;
        state.errors += batch.failures.len() as u64;

        for failure in &batch.failures {
            let kind = match failure.kind {
                FailureKind::Fetch => SystemErrorKind::SourceFetch,
                FailureKind::Parse => SystemErrorKind::Parsing,
            };
            self.log_system_error(
                kind,
                Some(failure.source_id.clone()),
                &format!("Failed to fetch from {}", failure.source_name),
                Some(failure.message.clone()),
            )
            .await;
        }

        let reports = batch.reports.len();
        let resolution = self.resolver.process_reports(batch.reports).await?;

        let records = self.store.constituencies().await?;
        let summary = summary::aggregate(&records, phase);
        let seats_declared = summary.seats_declared;
        self.store
            .merge_document(documents::SUMMARY, serde_json::to_value(&summary)?)
            .await?;

        let conflicts = self.store.conflicts().await?;
        let resolved_conflicts = conflicts.iter().filter(|c| c.is_resolved()).count();
        let now = now_millis();
        let next_fetch = collection_interval(phase).map(|i| now + i.as_millis() as i64);
        let news_stats = self.news.stats().await;
        let active_sources = self.registry.active_count().await;
        let source_health = self.registry.health().await;
        let source_summary = self.registry.summary().await;

        self.store
            .merge_document(
                documents::STATUS,
                json!({
                    "lastFetchTime": now,
                    "nextFetchTime": next_fetch,
                    "apiCallsToday": state.api_calls,
                    "errorsToday": state.errors,
                    "seatsDeclared": seats_declared,
                    "seatsTotal": summary.total_seats,
                    "collectionPhase": phase,
                    "activeSources": active_sources,
                    "totalConflicts": conflicts.len(),
                    "resolvedConflicts": resolved_conflicts,
                    "autoNewsCount": news_stats.total_auto_fetched,
                }),
            )
            .await?;

        self.store
            .merge_document(
                documents::SOURCES,
                json!({
                    "sources": source_health,
                    "summary": source_summary,
                }),
            )
            .await?;

        state.last_cycle_at = Some(now);
        info!(
            cycle,
            phase = %phase,
            reports,
            failures = batch.failures.len(),
            published = resolution.published,
            "Collection cycle complete"
        );

        Ok(CycleReport {
            cycle,
            phase,
            sources_attempted: batch.attempted,
            reports,
            failures: batch.failures.len(),
            resolution,
            news,
        })
    }

    async fn log_system_error(
        &self,
        kind: SystemErrorKind,
        source_id: Option<String>,
        message: &str,
        details: Option<String>,
    ) {
        let entry = SystemError {
            id: new_id(),
            timestamp: now_millis(),
            kind,
            source_id,
            message: message.to_string(),
            details,
            status: SystemErrorStatus::Active,
        };
        if let Err(e) = self.store.add_system_error(&entry).await {
            warn!(error = %e, context = message, "Could not record system error");
        }
    }

    pub async fn stats(&self) -> CollectorStats {
        let is_collecting = self.is_running().await;
        let phase = self.current_phase();
        let state = self.cycle.lock().await;
        CollectorStats {
            is_collecting,
            phase,
            is_active: collection_interval(phase).is_some(),
            interval_secs: collection_interval(phase).map(|d| d.as_secs()).unwrap_or(0),
            cycles: state.cycles,
            api_calls: state.api_calls,
            errors: state.errors,
            last_cycle_at: state.last_cycle_at,
        }
    }
}
