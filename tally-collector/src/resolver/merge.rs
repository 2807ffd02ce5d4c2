//! Tier-weighted merging of agreeing reports

use std::collections::{BTreeSet, HashMap};

use tally_common::models::{Candidate, SourceReport, SourceTier};

struct WeightedCandidate {
    name: String,
    party_id: String,
    name_tier: SourceTier,
    weighted_votes: f64,
    weight: f64,
    is_winner: bool,
    is_leading: bool,
}

/// Merge candidate lists across reports
///
/// Votes per candidate are the tier-weighted average over the reports that list
/// that candidate. The display name comes from the most authoritative report
/// listing it. Result is sorted by votes, descending.
pub fn merge_candidates(reports: &[SourceReport]) -> Vec<Candidate> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, WeightedCandidate> = HashMap::new();

    for report in reports {
        let weight = report.tier.merge_weight();
        for candidate in &report.constituency.candidates {
            let key = candidate.merge_key();
            let entry = merged.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                WeightedCandidate {
                    name: candidate.name.clone(),
                    party_id: candidate.party_id.to_lowercase(),
                    name_tier: report.tier,
                    weighted_votes: 0.0,
                    weight: 0.0,
                    is_winner: false,
                    is_leading: false,
                }
            });

            if report.tier < entry.name_tier && !candidate.name.is_empty() {
                entry.name = candidate.name.clone();
                entry.name_tier = report.tier;
            }
            entry.weighted_votes += candidate.votes as f64 * weight;
            entry.weight += weight;
            entry.is_winner |= candidate.is_winner;
            entry.is_leading |= candidate.is_leading;
        }
    }

    let mut candidates: Vec<Candidate> = order
        .iter()
        .filter_map(|key| merged.remove(key))
        .map(|c| Candidate {
            name: c.name,
            party_id: c.party_id,
            votes: (c.weighted_votes / c.weight).round() as u64,
            is_winner: c.is_winner,
            is_leading: c.is_leading,
        })
        .collect();

    // Stable, so equal vote counts keep first-seen order
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
    candidates
}

/// Tier-weighted average of the reported totals
pub fn weighted_total(reports: &[SourceReport]) -> u64 {
    let (sum, weight) = reports.iter().fold((0.0, 0.0), |(sum, weight), r| {
        let w = r.tier.merge_weight();
        (sum + r.constituency.total_votes as f64 * w, weight + w)
    });
    if weight == 0.0 {
        return 0;
    }
    (sum / weight).round() as u64
}

/// Every cited source across the reports, first occurrence order, no repeats
pub fn union_sources(reports: &[SourceReport]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    reports
        .iter()
        .flat_map(|r| r.sources_used.iter())
        .filter(|s| seen.insert(s.to_lowercase()))
        .cloned()
        .collect()
}

/// Reports from official or major national press sources
pub fn high_tier_count(reports: &[SourceReport]) -> usize {
    reports
        .iter()
        .filter(|r| r.tier <= SourceTier::MajorPress)
        .count()
}

/// Most authoritative report (lowest tier number, first on ties)
pub fn primary_report(reports: &[SourceReport]) -> Option<&SourceReport> {
    reports.iter().min_by_key(|r| r.tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::models::{ReportedConstituency, StatedConfidence};

    fn report(source: &str, tier: SourceTier, total: u64, candidates: Vec<Candidate>) -> SourceReport {
        SourceReport {
            source_id: source.to_string(),
            source_name: source.to_string(),
            tier,
            constituency: ReportedConstituency {
                number: 1,
                name: "Panchagarh-1".to_string(),
                candidates,
                total_votes: total,
                ..Default::default()
            },
            confidence: StatedConfidence::High,
            sources_used: vec![format!("{}.example", source)],
            fetched_at: 0,
        }
    }

    #[test]
    fn test_merged_votes_within_reported_bounds() {
        let reports = vec![
            report("a", SourceTier::Official, 100_000, vec![Candidate::new("X", "bnp", 60_000)]),
            report("b", SourceTier::MajorPress, 97_000, vec![Candidate::new("X", "BNP", 58_000)]),
            report("c", SourceTier::International, 103_000, vec![Candidate::new("X", "bnp", 61_500)]),
        ];

        let merged = merge_candidates(&reports);
        assert_eq!(merged.len(), 1);
        assert!((58_000..=61_500).contains(&merged[0].votes));

        let total = weighted_total(&reports);
        assert!((97_000..=103_000).contains(&total));
    }

    #[test]
    fn test_weighted_average_favours_higher_tier() {
        let reports = vec![
            report("official", SourceTier::Official, 100, vec![Candidate::new("X", "bnp", 100)]),
            report("intl", SourceTier::International, 70, vec![Candidate::new("X", "bnp", 70)]),
        ];
        // (100*1.0 + 70*0.5) / 1.5 = 90
        assert_eq!(merge_candidates(&reports)[0].votes, 90);
        assert_eq!(weighted_total(&reports), 90);
    }

    #[test]
    fn test_name_from_most_authoritative_report() {
        let reports = vec![
            report("intl", SourceTier::International, 10, vec![Candidate::new("M. Rahman", "bnp", 10)]),
            report("ec", SourceTier::Official, 10, vec![Candidate::new("Mizanur Rahman", "bnp", 10)]),
        ];
        assert_eq!(merge_candidates(&reports)[0].name, "Mizanur Rahman");
    }

    #[test]
    fn test_candidates_missing_party_merge_by_name() {
        let reports = vec![
            report("a", SourceTier::MajorPress, 10, vec![Candidate::new("Independent One", "", 10)]),
            report("b", SourceTier::MajorPress, 10, vec![Candidate::new("independent one", "", 20)]),
        ];
        let merged = merge_candidates(&reports);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].votes, 15);
    }

    #[test]
    fn test_merged_sorted_and_flags_carried() {
        let mut leader = Candidate::new("Y", "ncp", 500);
        leader.is_leading = true;
        let reports = vec![report(
            "a",
            SourceTier::MajorPress,
            800,
            vec![Candidate::new("X", "bnp", 300), leader],
        )];
        let merged = merge_candidates(&reports);
        assert_eq!(merged[0].party_id, "ncp");
        assert!(merged[0].is_leading);
        assert_eq!(merged[1].party_id, "bnp");
    }

    #[test]
    fn test_union_sources_and_counts() {
        let reports = vec![
            report("a", SourceTier::Official, 1, vec![]),
            report("a", SourceTier::International, 1, vec![]),
            report("b", SourceTier::MajorPress, 1, vec![]),
        ];
        assert_eq!(union_sources(&reports), vec!["a.example", "b.example"]);
        assert_eq!(high_tier_count(&reports), 2);
        assert_eq!(primary_report(&reports).map(|r| r.tier), Some(SourceTier::Official));
        assert_eq!(weighted_total(&[]), 0);
    }
}
