//! Conflict resolution
//!
//! Turns one cycle's reports into canonical writes, staged pending updates and
//! recorded conflicts. Constituencies are handled in ascending number order and
//! one failing constituency never aborts the rest of the batch.
//!
//! Paths per constituency:
//! - one report: scored against the canonical prior, written or staged
//! - several agreeing reports: tier-weighted merge with a consensus bonus
//! - only minor vote mismatches: the most authoritative report wins if it
//!   scores well enough on its own
//! - anything else: conflicts recorded as pending, every report staged
//!
//! The canonical cache is hydrated from the store on first use and kept in
//! step with every canonical write made through this resolver.

pub mod detect;
pub mod merge;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tally_common::catalog::{find_party, AVG_REGISTERED, TOTAL_SEATS};
use tally_common::models::{
    new_id, normalize_candidates, win_margin, AuditAction, AuditEntry, Candidate,
    ConflictResolution, ConflictSide, ConstituencyRecord, ConstituencyStatus, DataConflict,
    ElectionUpdate, PendingStatus, PendingUpdate, ReportedConstituency, SourceReport, SourceTier,
    StatedConfidence, UpdateKind,
};
use tally_common::time::now_millis;
use tally_common::{Error, Result};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::store::ElectionStore;
use crate::trust::TrustScorer;
use detect::{detect_pairwise, only_minor_vote_mismatches, PairConflict, VOTE_TOLERANCE_PERCENT};

/// Added to the merged score when independent sources agree
pub const CONSENSUS_BONUS: u8 = 10;

/// Agreeing tier 1-2 reports needed before a merged result may be terminal
pub const MIN_HIGH_TIER_FOR_DECLARED: usize = 2;

/// Ceiling on the trust of reports staged because of a conflict
pub const CONFLICT_STAGED_TRUST_CAP: u8 = 50;

/// Trust assigned to admin-entered or admin-approved data
pub const ADMIN_TRUST: u8 = 100;

pub const ADMIN_OVERRIDE_SOURCE: &str = "admin_override";

/// Counters for one `process_reports` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    pub constituencies: usize,
    pub published: usize,
    pub staged: usize,
    pub conflicts: usize,
    pub auto_resolved: usize,
    pub escalated: usize,
    pub failed: usize,
}

enum Outcome {
    Published,
    Staged,
    AutoResolved { conflicts: usize },
    Escalated { conflicts: usize },
}

impl ResolutionStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Published => self.published += 1,
            Outcome::Staged => self.staged += 1,
            Outcome::AutoResolved { conflicts } => {
                self.published += 1;
                self.auto_resolved += 1;
                self.conflicts += conflicts;
            }
            Outcome::Escalated { conflicts } => {
                self.escalated += 1;
                self.conflicts += conflicts;
            }
        }
    }
}

/// Fields of one canonical write other than the claimed data
struct CanonicalWrite {
    status: ConstituencyStatus,
    trust_score: u8,
    provenance: String,
    action: AuditAction,
    kind: Option<UpdateKind>,
}

pub struct ConflictResolver {
    store: Arc<dyn ElectionStore>,
    scorer: TrustScorer,
    tolerance: f64,
    cache: RwLock<Option<HashMap<u32, ConstituencyRecord>>>,
    /// Serializes every canonical writer (cycles and admin operations)
    write_gate: Mutex<()>,
}

impl ConflictResolver {
    pub fn new(store: Arc<dyn ElectionStore>) -> Self {
        Self::with_scorer(store, TrustScorer::default())
    }

    pub fn with_scorer(store: Arc<dyn ElectionStore>, scorer: TrustScorer) -> Self {
        Self {
            store,
            scorer,
            tolerance: VOTE_TOLERANCE_PERCENT,
            cache: RwLock::new(None),
            write_gate: Mutex::new(()),
        }
    }

    pub fn scorer(&self) -> &TrustScorer {
        &self.scorer
    }

    /// Resolve one cycle's reports
    ///
    /// Per-constituency failures are logged and counted in `failed`; only a
    /// failure to hydrate the canonical cache fails the whole call.
    pub async fn process_reports(&self, reports: Vec<SourceReport>) -> Result<ResolutionStats> {
        let _gate = self.write_gate.lock().await;
        self.hydrate().await?;

        let grouped = group_reports(reports);
        let mut stats = ResolutionStats {
            constituencies: grouped.len(),
            ..Default::default()
        };

        for (number, group) in grouped {
            let result = if group.len() == 1 {
                self.resolve_single(&group[0]).await
            } else {
                self.resolve_multiple(number, group).await
            };

            match result {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    warn!(constituency = number, error = %e, "Failed to resolve constituency");
                    stats.failed += 1;
                }
            }
        }

        info!(
            constituencies = stats.constituencies,
            published = stats.published,
            staged = stats.staged,
            conflicts = stats.conflicts,
            failed = stats.failed,
            "Resolution pass complete"
        );
        Ok(stats)
    }

    async fn resolve_single(&self, report: &SourceReport) -> Result<Outcome> {
        let number = report.constituency.number;
        let prior = self.canonical(number).await?;
        let assessment = self.scorer.score(
            &report.constituency,
            prior.as_ref(),
            &report.sources_used,
            report.confidence,
        );

        if !self.scorer.should_auto_publish(assessment.score) {
            debug!(
                constituency = number,
                source = %report.source_id,
                score = assessment.score,
                "Single-source report below threshold"
            );
            self.stage_pending(report, report.constituency.clone(), assessment.score, None, prior.as_ref())
                .await?;
            return Ok(Outcome::Staged);
        }

        let claimed = claimed_status(
            report.constituency.status,
            report.tier == SourceTier::Official,
        );
        let status = effective_status(claimed, prior.as_ref(), &report.constituency);
        let action = if prior.is_some() {
            AuditAction::Update
        } else {
            AuditAction::Create
        };

        self.write_canonical(
            prior,
            report.constituency.clone(),
            CanonicalWrite {
                status,
                trust_score: assessment.score,
                provenance: report.source_name.clone(),
                action,
                kind: None,
            },
        )
        .await?;
        Ok(Outcome::Published)
    }

    async fn resolve_multiple(&self, number: u32, reports: Vec<SourceReport>) -> Result<Outcome> {
        let prior = self.canonical(number).await?;
        let conflicts = detect_pairwise(&reports, self.tolerance);

        if conflicts.is_empty() {
            return self.publish_consensus(prior, &reports).await;
        }

        if only_minor_vote_mismatches(&conflicts) {
            if let Some(outcome) = self.try_auto_resolve(prior.as_ref(), &reports, &conflicts).await? {
                return Ok(outcome);
            }
        }

        self.escalate(prior.as_ref(), &reports, &conflicts).await
    }

    async fn publish_consensus(
        &self,
        prior: Option<ConstituencyRecord>,
        reports: &[SourceReport],
    ) -> Result<Outcome> {
        let Some(primary) = merge::primary_report(reports) else {
            return Ok(Outcome::Staged);
        };

        let mut merged = primary.constituency.clone();
        merged.candidates = merge::merge_candidates(reports);
        merged.total_votes = merge::weighted_total(reports);
        merged.win_margin = win_margin(&merged.candidates);

        let sources = merge::union_sources(reports);
        let assessment =
            self.scorer
                .score(&merged, prior.as_ref(), &sources, StatedConfidence::High);
        let score = assessment.score.saturating_add(CONSENSUS_BONUS).min(100);

        if !self.scorer.should_auto_publish(score) {
            debug!(
                constituency = merged.number,
                sources = reports.len(),
                score,
                "Consensus below threshold"
            );
            self.stage_pending(primary, merged, score, None, prior.as_ref()).await?;
            return Ok(Outcome::Staged);
        }

        let high_tier = merge::high_tier_count(reports);
        let claimed = claimed_status(merged.status, high_tier >= MIN_HIGH_TIER_FOR_DECLARED);
        let status = effective_status(claimed, prior.as_ref(), &merged);
        let provenance = reports
            .iter()
            .map(|r| r.source_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        self.write_canonical(
            prior,
            merged,
            CanonicalWrite {
                status,
                trust_score: score,
                provenance: format!("consensus ({})", provenance),
                action: AuditAction::AutoPublish,
                kind: None,
            },
        )
        .await?;
        Ok(Outcome::Published)
    }

    /// Publish the most authoritative report when it scores well on its own
    ///
    /// Returns `None` when it does not, leaving escalation to the caller.
    async fn try_auto_resolve(
        &self,
        prior: Option<&ConstituencyRecord>,
        reports: &[SourceReport],
        conflicts: &[PairConflict],
    ) -> Result<Option<Outcome>> {
        let Some(preferred) = merge::primary_report(reports) else {
            return Ok(None);
        };

        let sources = merge::union_sources(reports);
        let assessment =
            self.scorer
                .score(&preferred.constituency, prior, &sources, preferred.confidence);
        if !self.scorer.should_auto_publish(assessment.score) {
            debug!(
                constituency = preferred.constituency.number,
                score = assessment.score,
                "Preferred report below threshold, escalating"
            );
            return Ok(None);
        }

        let allow_terminal = preferred.tier == SourceTier::Official
            || merge::high_tier_count(reports) >= MIN_HIGH_TIER_FOR_DECLARED;
        let claimed = claimed_status(preferred.constituency.status, allow_terminal);
        let status = effective_status(claimed, prior, &preferred.constituency);

        self.write_canonical(
            prior.cloned(),
            preferred.constituency.clone(),
            CanonicalWrite {
                status,
                trust_score: assessment.score,
                provenance: format!("{} (auto-resolved)", preferred.source_name),
                action: AuditAction::ConflictResolve,
                kind: None,
            },
        )
        .await?;

        let note = format!(
            "Auto-resolved: preferred {} (Tier {})",
            preferred.source_name,
            preferred.tier.number()
        );
        let now = now_millis();
        for pair in conflicts {
            let mut conflict = conflict_record(prior, reports, pair, now);
            conflict.resolved_by = ConflictResolution::AutoConsensus;
            conflict.resolution = Some(note.clone());
            conflict.resolved_at = Some(now);
            self.store.add_conflict(&conflict).await?;
        }

        info!(
            constituency = preferred.constituency.number,
            preferred = %preferred.source_id,
            conflicts = conflicts.len(),
            "Vote mismatch auto-resolved"
        );
        Ok(Some(Outcome::AutoResolved {
            conflicts: conflicts.len(),
        }))
    }

    async fn escalate(
        &self,
        prior: Option<&ConstituencyRecord>,
        reports: &[SourceReport],
        conflicts: &[PairConflict],
    ) -> Result<Outcome> {
        let now = now_millis();
        let mut linked: Vec<Option<String>> = vec![None; reports.len()];

        for pair in conflicts {
            let conflict = conflict_record(prior, reports, pair, now);
            self.store.add_conflict(&conflict).await?;
            for side in [pair.a, pair.b] {
                if linked[side].is_none() {
                    linked[side] = Some(conflict.id.clone());
                }
            }
        }

        for (report, conflict_id) in reports.iter().zip(linked) {
            let own = self.scorer.score(
                &report.constituency,
                prior,
                &report.sources_used,
                report.confidence,
            );
            let trust = own.score.min(CONFLICT_STAGED_TRUST_CAP);
            self.stage_pending(report, report.constituency.clone(), trust, conflict_id, prior)
                .await?;
        }

        warn!(
            constituency = reports.first().map(|r| r.constituency.number).unwrap_or_default(),
            conflicts = conflicts.len(),
            reports = reports.len(),
            "Conflicting reports escalated for review"
        );
        Ok(Outcome::Escalated {
            conflicts: conflicts.len(),
        })
    }

    async fn stage_pending(
        &self,
        report: &SourceReport,
        data: ReportedConstituency,
        trust_score: u8,
        conflict_id: Option<String>,
        prior: Option<&ConstituencyRecord>,
    ) -> Result<()> {
        let (constituency_id, constituency_name) = identity(prior, &data);
        let pending = PendingUpdate {
            id: new_id(),
            constituency_id,
            constituency_name,
            source: report.source_name.clone(),
            source_tier: report.tier,
            data,
            timestamp: now_millis(),
            trust_score,
            status: PendingStatus::Pending,
            conflict_id,
        };
        self.store.add_pending_update(&pending).await
    }

    async fn write_canonical(
        &self,
        prior: Option<ConstituencyRecord>,
        data: ReportedConstituency,
        write: CanonicalWrite,
    ) -> Result<ConstituencyRecord> {
        let (id, name) = identity(prior.as_ref(), &data);
        let mut candidates = data.candidates;
        normalize_candidates(&mut candidates, write.status);

        let total_votes = if data.total_votes > 0 {
            data.total_votes
        } else {
            candidates.iter().map(|c| c.votes).sum()
        };
        let total_registered = prior
            .as_ref()
            .map(|p| p.total_registered)
            .filter(|r| *r > 0)
            .unwrap_or(AVG_REGISTERED);

        let record = ConstituencyRecord {
            id,
            number: data.number,
            name,
            division: non_empty_or(data.division, prior.as_ref().map(|p| p.division.as_str())),
            district: non_empty_or(data.district, prior.as_ref().map(|p| p.district.as_str())),
            win_margin: win_margin(&candidates),
            candidates,
            status: write.status,
            total_votes,
            total_registered,
            turnout_percent: turnout(total_votes, total_registered),
            trust_score: write.trust_score,
            source: write.provenance,
            last_updated: now_millis(),
        };

        self.store.put_constituency(&record).await?;
        if let Some(cache) = self.cache.write().await.as_mut() {
            cache.insert(record.number, record.clone());
        }

        let entry = AuditEntry {
            id: new_id(),
            constituency_id: record.id.clone(),
            constituency_name: record.name.clone(),
            action: write.action,
            source: record.source.clone(),
            previous_data: prior.as_ref().map(serde_json::to_value).transpose()?,
            new_data: serde_json::to_value(&record)?,
            timestamp: record.last_updated,
            trust_score: record.trust_score,
        };
        self.store.add_audit_entry(&entry).await?;

        // Ticker failures are logged; the record and audit entry stand
        let update = ticker_update(&record, write.kind, self.scorer.should_auto_publish(record.trust_score));
        if let Err(e) = self.store.add_update(&update).await {
            warn!(constituency = record.number, error = %e, "Failed to append ticker update");
        }

        info!(
            constituency = record.number,
            status = %record.status,
            trust = record.trust_score,
            source = %record.source,
            "Canonical record written"
        );
        Ok(record)
    }

    async fn hydrate(&self) -> Result<()> {
        if self.cache.read().await.is_some() {
            return Ok(());
        }

        let records = self.store.constituencies().await?;
        let mut cache = self.cache.write().await;
        if cache.is_none() {
            debug!(count = records.len(), "Canonical cache hydrated");
            *cache = Some(records.into_iter().map(|r| (r.number, r)).collect());
        }
        Ok(())
    }

    /// Current canonical record for a constituency number
    pub async fn canonical(&self, number: u32) -> Result<Option<ConstituencyRecord>> {
        self.hydrate().await?;
        Ok(self
            .cache
            .read()
            .await
            .as_ref()
            .and_then(|cache| cache.get(&number).cloned()))
    }

    /// All canonical records, ascending by number
    pub async fn canonical_records(&self) -> Result<Vec<ConstituencyRecord>> {
        self.hydrate().await?;
        let mut records: Vec<ConstituencyRecord> = self
            .cache
            .read()
            .await
            .as_ref()
            .map(|cache| cache.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.number);
        Ok(records)
    }

    /// Replace the canonical collection and the cache
    pub async fn reseed(&self, records: Vec<ConstituencyRecord>) -> Result<usize> {
        let _gate = self.write_gate.lock().await;
        self.store.seed_constituencies(&records).await?;

        let count = records.len();
        *self.cache.write().await = Some(records.into_iter().map(|r| (r.number, r)).collect());
        info!(count, "Constituencies re-seeded");
        Ok(count)
    }

    /// Admin write of a constituency result with full trust
    ///
    /// Candidate flags are recomputed from the vote order: the top candidate
    /// wins on a terminal status and leads otherwise.
    pub async fn admin_override(
        &self,
        number: u32,
        status: ConstituencyStatus,
        mut candidates: Vec<Candidate>,
    ) -> Result<ConstituencyRecord> {
        if number == 0 || number > TOTAL_SEATS {
            return Err(Error::InvalidInput(format!(
                "constituency number must be 1-{}, got {}",
                TOTAL_SEATS, number
            )));
        }

        let _gate = self.write_gate.lock().await;
        let prior = self.canonical(number).await?;

        candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
        for (idx, candidate) in candidates.iter_mut().enumerate() {
            candidate.party_id = candidate.party_id.trim().to_lowercase();
            candidate.is_winner = idx == 0 && candidate.votes > 0;
            candidate.is_leading = false;
        }

        let data = ReportedConstituency {
            number,
            total_votes: candidates.iter().map(|c| c.votes).sum(),
            status: Some(status),
            candidates,
            ..Default::default()
        };

        warn!(constituency = number, status = %status, "Admin override applied");
        self.write_canonical(
            prior,
            data,
            CanonicalWrite {
                status,
                trust_score: ADMIN_TRUST,
                provenance: ADMIN_OVERRIDE_SOURCE.to_string(),
                action: AuditAction::ManualOverride,
                kind: Some(UpdateKind::Correction),
            },
        )
        .await
    }

    /// Mark a conflict as settled by an administrator
    pub async fn resolve_conflict(&self, id: &str, resolution: &str) -> Result<DataConflict> {
        let resolved = self
            .store
            .resolve_conflict(id, ConflictResolution::AdminOverride, resolution, now_millis())
            .await?;
        if !resolved {
            return Err(Error::NotFound(format!("conflict {}", id)));
        }

        info!(conflict_id = %id, "Conflict resolved by admin");
        self.store
            .conflict(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conflict {}", id)))
    }

    /// Publish a staged update with full trust
    pub async fn approve_pending_update(&self, id: &str) -> Result<ConstituencyRecord> {
        let _gate = self.write_gate.lock().await;
        let pending = self.reviewable(id).await?;
        let prior = self.canonical(pending.data.number).await?;

        let status = pending
            .data
            .status
            .or(prior.as_ref().map(|p| p.status))
            .unwrap_or_else(|| status_from_votes(&pending.data));

        let record = self
            .write_canonical(
                prior,
                pending.data.clone(),
                CanonicalWrite {
                    status,
                    trust_score: ADMIN_TRUST,
                    provenance: format!("{} (approved)", pending.source),
                    action: AuditAction::ManualOverride,
                    kind: None,
                },
            )
            .await?;

        self.store
            .set_pending_status(id, PendingStatus::Approved)
            .await?;

        if pending.conflict_id.is_some() {
            self.close_conflicts_for(&pending).await?;
        }

        info!(pending_id = %id, constituency = record.number, "Pending update approved");
        Ok(record)
    }

    /// Settle the conflict linked to an approved update and every other
    /// conflict still pending for the same constituency
    async fn close_conflicts_for(&self, pending: &PendingUpdate) -> Result<()> {
        let mut ids: Vec<String> = self
            .store
            .conflicts()
            .await?
            .into_iter()
            .filter(|c| {
                c.constituency_id == pending.constituency_id
                    && c.resolved_by == ConflictResolution::Pending
            })
            .map(|c| c.id)
            .collect();
        if let Some(linked) = &pending.conflict_id {
            if !ids.contains(linked) {
                ids.push(linked.clone());
            }
        }

        let note = format!("Approved {} data for {}", pending.source, pending.constituency_name);
        let now = now_millis();
        for conflict_id in &ids {
            self.store
                .resolve_conflict(conflict_id, ConflictResolution::AdminOverride, &note, now)
                .await?;
        }
        debug!(
            constituency_id = %pending.constituency_id,
            conflicts = ids.len(),
            "Conflicts closed by approval"
        );
        Ok(())
    }

    pub async fn reject_pending_update(&self, id: &str) -> Result<()> {
        self.reviewable(id).await?;
        self.store
            .set_pending_status(id, PendingStatus::Rejected)
            .await?;
        info!(pending_id = %id, "Pending update rejected");
        Ok(())
    }

    async fn reviewable(&self, id: &str) -> Result<PendingUpdate> {
        let pending = self
            .store
            .pending_update(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("pending update {}", id)))?;
        if pending.status != PendingStatus::Pending {
            return Err(Error::InvalidInput(format!(
                "pending update {} was already {}",
                id,
                pending.status.as_str()
            )));
        }
        Ok(pending)
    }
}

/// At most one report per source per constituency (first wins), ascending by number
fn group_reports(reports: Vec<SourceReport>) -> BTreeMap<u32, Vec<SourceReport>> {
    let mut grouped: BTreeMap<u32, Vec<SourceReport>> = BTreeMap::new();
    for report in reports {
        let group = grouped.entry(report.constituency.number).or_default();
        if group.iter().any(|r| r.source_id == report.source_id) {
            debug!(
                constituency = report.constituency.number,
                source = %report.source_id,
                "Duplicate report from same source ignored"
            );
            continue;
        }
        group.push(report);
    }
    grouped
}

/// Status a report may claim; terminal claims need `allow_terminal`
fn claimed_status(
    status: Option<ConstituencyStatus>,
    allow_terminal: bool,
) -> Option<ConstituencyStatus> {
    status.map(|s| {
        if s.is_terminal() && !allow_terminal {
            ConstituencyStatus::Counting
        } else {
            s
        }
    })
}

/// Status written on the automatic path
///
/// Never steps back from the prior canonical status and never leaves a
/// terminal one.
fn effective_status(
    claimed: Option<ConstituencyStatus>,
    prior: Option<&ConstituencyRecord>,
    data: &ReportedConstituency,
) -> ConstituencyStatus {
    let prior_status = prior.map(|p| p.status);
    let Some(claimed) = claimed else {
        return prior_status.unwrap_or_else(|| status_from_votes(data));
    };

    match prior_status {
        Some(previous) if previous.regresses_to(claimed) => previous,
        Some(previous) if previous.is_terminal() && !claimed.is_terminal() => previous,
        _ => claimed,
    }
}

fn status_from_votes(data: &ReportedConstituency) -> ConstituencyStatus {
    if data.total_votes > 0 || data.candidates.iter().any(|c| c.votes > 0) {
        ConstituencyStatus::Counting
    } else {
        ConstituencyStatus::NotStarted
    }
}

fn identity(prior: Option<&ConstituencyRecord>, data: &ReportedConstituency) -> (String, String) {
    match prior {
        Some(p) => (
            p.id.clone(),
            if p.name.is_empty() { data.name.clone() } else { p.name.clone() },
        ),
        None => {
            let name = if data.name.is_empty() {
                format!("Constituency {}", data.number)
            } else {
                data.name.clone()
            };
            (ConstituencyRecord::fallback_id(data.number), name)
        }
    }
}

fn non_empty_or(value: String, fallback: Option<&str>) -> String {
    if value.trim().is_empty() {
        fallback.unwrap_or_default().to_string()
    } else {
        value
    }
}

/// Percent of registered voters, one decimal
fn turnout(total_votes: u64, registered: u64) -> f64 {
    if registered == 0 {
        return 0.0;
    }
    (total_votes as f64 / registered as f64 * 1000.0).round() / 10.0
}

fn conflict_record(
    prior: Option<&ConstituencyRecord>,
    reports: &[SourceReport],
    pair: &PairConflict,
    now: i64,
) -> DataConflict {
    let a = &reports[pair.a];
    let b = &reports[pair.b];
    let (constituency_id, constituency_name) = identity(prior, &a.constituency);

    DataConflict {
        id: new_id(),
        constituency_id,
        constituency_name,
        conflict_type: pair.conflict.conflict_type,
        severity: pair.conflict.severity,
        source_a: side(a),
        source_b: side(b),
        resolved_by: ConflictResolution::Pending,
        resolution: None,
        resolved_at: None,
        created_at: now,
    }
}

fn side(report: &SourceReport) -> ConflictSide {
    ConflictSide {
        name: report.source_name.clone(),
        tier: report.tier,
        data: report.constituency.clone(),
        timestamp: report.fetched_at,
    }
}

fn ticker_update(
    record: &ConstituencyRecord,
    kind_override: Option<UpdateKind>,
    is_verified: bool,
) -> ElectionUpdate {
    let (kind, message) = match (record.winner(), record.leader()) {
        (Some(winner), _) if record.status.is_terminal() => (
            UpdateKind::ResultDeclared,
            format!(
                "{}: {} ({}) wins with {} votes",
                record.name,
                winner.name,
                party_label(&winner.party_id),
                format_votes(winner.votes)
            ),
        ),
        (_, Some(leader)) => (
            UpdateKind::LeadChange,
            format!(
                "{}: {} ({}) leading with {} votes",
                record.name,
                leader.name,
                party_label(&leader.party_id),
                format_votes(leader.votes)
            ),
        ),
        _ => (
            UpdateKind::VoteUpdate,
            format!("{}: Counting in progress", record.name),
        ),
    };

    ElectionUpdate {
        id: new_id(),
        constituency_id: record.id.clone(),
        constituency_name: record.name.clone(),
        timestamp: record.last_updated,
        kind: kind_override.unwrap_or(kind),
        message,
        trust_score: record.trust_score,
        source: record.source.clone(),
        is_verified,
    }
}

fn party_label(party_id: &str) -> String {
    find_party(party_id)
        .map(|p| p.short_name.to_string())
        .unwrap_or_else(|| party_id.to_uppercase())
}

/// 1234567 -> "1,234,567"
pub fn format_votes(votes: u64) -> String {
    let digits = votes.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
