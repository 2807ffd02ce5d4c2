//! Pairwise conflict detection between reports for the same constituency

use tally_common::models::{ConflictSeverity, ConflictType, ReportedConstituency, SourceReport};

/// Relative vote difference (percent of the larger total) tolerated silently
pub const VOTE_TOLERANCE_PERCENT: f64 = 5.0;

const HIGH_VOTE_MISMATCH_PERCENT: f64 = 10.0;
const CRITICAL_VOTE_MISMATCH_PERCENT: f64 = 20.0;

/// Statuses further apart than this on the progression conflict
const MAX_STATUS_STEP: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedConflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
}

/// A conflict between the reports at `a` and `b` of the compared slice
#[derive(Debug, Clone, PartialEq)]
pub struct PairConflict {
    pub a: usize,
    pub b: usize,
    pub conflict: DetectedConflict,
}

/// Percent difference between two totals relative to the larger one
///
/// `None` when either side reports no votes (nothing to compare).
pub fn relative_vote_difference(a: u64, b: u64) -> Option<f64> {
    if a == 0 || b == 0 {
        return None;
    }
    let larger = a.max(b) as f64;
    Some(a.abs_diff(b) as f64 / larger * 100.0)
}

/// Severity for a vote difference, `None` within tolerance
pub fn vote_mismatch_severity(percent_diff: f64, tolerance: f64) -> Option<ConflictSeverity> {
    if percent_diff > CRITICAL_VOTE_MISMATCH_PERCENT {
        Some(ConflictSeverity::Critical)
    } else if percent_diff > HIGH_VOTE_MISMATCH_PERCENT {
        Some(ConflictSeverity::High)
    } else if percent_diff > tolerance {
        Some(ConflictSeverity::Medium)
    } else {
        None
    }
}

fn normalized_party(party: &str) -> String {
    party.trim().to_lowercase()
}

/// Compare two claims; the result does not depend on argument order
pub fn compare_reports(
    a: &ReportedConstituency,
    b: &ReportedConstituency,
    tolerance: f64,
) -> Vec<DetectedConflict> {
    let mut conflicts = Vec::new();

    if let Some(severity) = relative_vote_difference(a.total_votes, b.total_votes)
        .and_then(|pct| vote_mismatch_severity(pct, tolerance))
    {
        conflicts.push(DetectedConflict {
            conflict_type: ConflictType::VoteMismatch,
            severity,
        });
    }

    if let (Some(leader_a), Some(leader_b)) = (a.leading_party(), b.leading_party()) {
        if normalized_party(leader_a) != normalized_party(leader_b) {
            conflicts.push(DetectedConflict {
                conflict_type: ConflictType::WinnerDisagreement,
                severity: ConflictSeverity::Critical,
            });
        }
    }

    let steps = a
        .status
        .and_then(|s| s.progression_index())
        .zip(b.status.and_then(|s| s.progression_index()));
    if let Some((ia, ib)) = steps {
        if ia.abs_diff(ib) > MAX_STATUS_STEP {
            conflicts.push(DetectedConflict {
                conflict_type: ConflictType::StatusRegression,
                severity: ConflictSeverity::High,
            });
        }
    }

    conflicts
}

/// Every conflict between every pair of reports
pub fn detect_pairwise(reports: &[SourceReport], tolerance: f64) -> Vec<PairConflict> {
    let mut found = Vec::new();
    for a in 0..reports.len() {
        for b in (a + 1)..reports.len() {
            for conflict in
                compare_reports(&reports[a].constituency, &reports[b].constituency, tolerance)
            {
                found.push(PairConflict { a, b, conflict });
            }
        }
    }
    found
}

/// True when every conflict is a vote mismatch below critical severity
pub fn only_minor_vote_mismatches(conflicts: &[PairConflict]) -> bool {
    conflicts.iter().all(|c| {
        c.conflict.conflict_type == ConflictType::VoteMismatch
            && c.conflict.severity < ConflictSeverity::Critical
    })
}
