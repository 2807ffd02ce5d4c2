//! Report and envelope builders

use serde_json::json;
use tally_common::models::{
    Candidate, ConstituencyStatus, ReportedConstituency, SourceReport, SourceTier,
    StatedConfidence,
};
use tally_common::time::now_millis;

pub fn sources(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Two candidates splitting `total` 60/40; the `leader` party takes 60%
///
/// The leader is flagged as winner on a terminal status, leading otherwise.
pub fn candidates(total: u64, leader: &str, status: ConstituencyStatus) -> Vec<Candidate> {
    let runner_up = if leader == "bnp" { "jamaat" } else { "bnp" };
    let mut first = Candidate::new(format!("{} candidate", leader), leader, total * 6 / 10);
    if status.is_terminal() {
        first.is_winner = true;
    } else {
        first.is_leading = true;
    }
    let second = Candidate::new(
        format!("{} candidate", runner_up),
        runner_up,
        total - total * 6 / 10,
    );
    vec![first, second]
}

/// One source's claim about one constituency
pub fn report(
    source_id: &str,
    tier: SourceTier,
    number: u32,
    total: u64,
    leader: &str,
    status: ConstituencyStatus,
    cited: &[&str],
) -> SourceReport {
    SourceReport {
        source_id: source_id.to_string(),
        source_name: source_id.to_string(),
        tier,
        constituency: ReportedConstituency {
            number,
            name: format!("Seat-{}", number),
            division: String::new(),
            district: String::new(),
            status: Some(status),
            candidates: candidates(total, leader, status),
            total_votes: total,
            win_margin: 0,
        },
        confidence: StatedConfidence::High,
        sources_used: sources(cited),
        fetched_at: now_millis(),
    }
}

/// Results envelope text as an extraction answer would carry it
pub fn results_json(entries: &[(u32, u64, &str, &str)], cited: &[&str]) -> String {
    let results: Vec<_> = entries
        .iter()
        .map(|(number, total, leader, status)| {
            json!({
                "constituencyNumber": number,
                "constituencyName": format!("Seat-{}", number),
                "status": status,
                "candidates": [
                    { "name": "Leader", "partyId": leader, "votes": total * 6 / 10, "isLeading": true },
                    { "name": "Runner-up", "partyId": "others", "votes": total - total * 6 / 10 }
                ],
                "totalVotes": total,
            })
        })
        .collect();

    json!({
        "results": results,
        "sourcesUsed": cited,
        "confidenceLevel": "high",
    })
    .to_string()
}
