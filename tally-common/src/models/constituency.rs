//! Canonical constituency records

use serde::{Deserialize, Serialize};

/// Counting status of a constituency
///
/// Progression is `not_started → counting → declared → result_confirmed`.
/// `postponed` is a side-state outside that ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstituencyStatus {
    NotStarted,
    Counting,
    Declared,
    ResultConfirmed,
    Postponed,
}

impl ConstituencyStatus {
    /// Position on the counting progression, `None` for postponed seats
    pub fn progression_index(self) -> Option<u8> {
        match self {
            ConstituencyStatus::NotStarted => Some(0),
            ConstituencyStatus::Counting => Some(1),
            ConstituencyStatus::Declared => Some(2),
            ConstituencyStatus::ResultConfirmed => Some(3),
            ConstituencyStatus::Postponed => None,
        }
    }

    /// Declared or confirmed
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConstituencyStatus::Declared | ConstituencyStatus::ResultConfirmed
        )
    }

    /// True when moving from `self` to `next` steps backwards on the progression
    pub fn regresses_to(self, next: ConstituencyStatus) -> bool {
        match (self.progression_index(), next.progression_index()) {
            (Some(from), Some(to)) => to < from,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConstituencyStatus::NotStarted => "not_started",
            ConstituencyStatus::Counting => "counting",
            ConstituencyStatus::Declared => "declared",
            ConstituencyStatus::ResultConfirmed => "result_confirmed",
            ConstituencyStatus::Postponed => "postponed",
        }
    }

    /// Lenient parse used on extracted text ("Declared", "result confirmed", ...)
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "not_started" | "notstarted" | "pending" => Some(ConstituencyStatus::NotStarted),
            "counting" | "in_progress" => Some(ConstituencyStatus::Counting),
            "declared" => Some(ConstituencyStatus::Declared),
            "result_confirmed" | "confirmed" => Some(ConstituencyStatus::ResultConfirmed),
            "postponed" => Some(ConstituencyStatus::Postponed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstituencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate line in a constituency result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    #[serde(rename = "party")]
    pub party_id: String,
    pub votes: u64,
    #[serde(default)]
    pub is_winner: bool,
    #[serde(default)]
    pub is_leading: bool,
}

impl Candidate {
    pub fn new(name: impl Into<String>, party_id: impl Into<String>, votes: u64) -> Self {
        Self {
            name: name.into(),
            party_id: party_id.into(),
            votes,
            is_winner: false,
            is_leading: false,
        }
    }

    /// Merge key: party id when present, otherwise the lowercased name
    pub fn merge_key(&self) -> String {
        let party = self.party_id.trim();
        if party.is_empty() {
            self.name.trim().to_lowercase()
        } else {
            party.to_lowercase()
        }
    }
}

/// Canonical, published state of one seat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituencyRecord {
    pub id: String,
    pub number: u32,
    pub name: String,
    pub division: String,
    pub district: String,
    pub candidates: Vec<Candidate>,
    pub status: ConstituencyStatus,
    pub total_votes: u64,
    pub total_registered: u64,
    pub turnout_percent: f64,
    pub win_margin: u64,
    pub trust_score: u8,
    /// Provenance of the last canonical write
    pub source: String,
    pub last_updated: i64,
}

impl ConstituencyRecord {
    /// Identifier used for seats that were never seeded
    pub fn fallback_id(number: u32) -> String {
        format!("constituency-{}", number)
    }

    /// First candidate flagged as winner or leader
    pub fn leader(&self) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.is_winner || c.is_leading)
    }

    pub fn winner(&self) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.is_winner)
    }
}

/// Sort candidates by votes and make the winner/leader flags consistent with `status`
///
/// On a terminal status exactly one candidate wins: the first flagged winner,
/// else the first flagged leader, else the top vote-getter when anyone has
/// votes. On any other status winner claims become a single leader flag.
pub fn normalize_candidates(candidates: &mut [Candidate], status: ConstituencyStatus) {
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

    if status.is_terminal() {
        let winner = candidates
            .iter()
            .position(|c| c.is_winner)
            .or_else(|| candidates.iter().position(|c| c.is_leading))
            .or_else(|| candidates.first().filter(|c| c.votes > 0).map(|_| 0));
        for (idx, candidate) in candidates.iter_mut().enumerate() {
            candidate.is_winner = Some(idx) == winner;
            candidate.is_leading = false;
        }
    } else {
        let leader = candidates.iter().position(|c| c.is_winner || c.is_leading);
        for (idx, candidate) in candidates.iter_mut().enumerate() {
            candidate.is_winner = false;
            candidate.is_leading = Some(idx) == leader;
        }
    }
}

/// Difference between the top two vote counts (0 with fewer than two candidates)
///
/// Expects candidates sorted descending.
pub fn win_margin(candidates: &[Candidate]) -> u64 {
    match candidates {
        [first, second, ..] => first.votes.saturating_sub(second.votes),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progression_skips_postponed() {
        assert!(ConstituencyStatus::Declared.regresses_to(ConstituencyStatus::Counting));
        assert!(!ConstituencyStatus::Counting.regresses_to(ConstituencyStatus::Declared));
        assert!(!ConstituencyStatus::Declared.regresses_to(ConstituencyStatus::Postponed));
        assert!(!ConstituencyStatus::Postponed.regresses_to(ConstituencyStatus::NotStarted));
    }

    #[test]
    fn test_parse_lenient_accepts_display_forms() {
        assert_eq!(
            ConstituencyStatus::parse_lenient("Result Confirmed"),
            Some(ConstituencyStatus::ResultConfirmed)
        );
        assert_eq!(
            ConstituencyStatus::parse_lenient(" counting "),
            Some(ConstituencyStatus::Counting)
        );
        assert_eq!(ConstituencyStatus::parse_lenient("unknown"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ConstituencyStatus::ResultConfirmed).unwrap();
        assert_eq!(json, "\"result_confirmed\"");
    }

    #[test]
    fn test_normalize_keeps_single_winner_on_terminal() {
        let mut candidates = vec![
            Candidate { is_winner: true, ..Candidate::new("B", "ncp", 100) },
            Candidate { is_winner: true, ..Candidate::new("A", "bnp", 300) },
        ];
        normalize_candidates(&mut candidates, ConstituencyStatus::Declared);

        assert_eq!(candidates[0].name, "A");
        assert_eq!(candidates.iter().filter(|c| c.is_winner).count(), 1);
        assert!(candidates[0].is_winner);
    }

    #[test]
    fn test_normalize_promotes_leader_to_winner_on_terminal() {
        let mut candidates = vec![
            Candidate::new("A", "bnp", 300),
            Candidate { is_leading: true, ..Candidate::new("B", "jamaat", 200) },
        ];
        normalize_candidates(&mut candidates, ConstituencyStatus::Declared);

        assert_eq!(candidates[1].name, "B");
        assert!(candidates[1].is_winner);
        assert!(!candidates[0].is_winner);
        assert!(candidates.iter().all(|c| !c.is_leading));
    }

    #[test]
    fn test_normalize_falls_back_to_top_votes_on_terminal() {
        let mut candidates = vec![
            Candidate::new("B", "ncp", 100),
            Candidate::new("A", "bnp", 300),
        ];
        normalize_candidates(&mut candidates, ConstituencyStatus::ResultConfirmed);
        assert_eq!(candidates[0].name, "A");
        assert!(candidates[0].is_winner);

        let mut empty = vec![Candidate::new("A", "bnp", 0)];
        normalize_candidates(&mut empty, ConstituencyStatus::Declared);
        assert!(!empty[0].is_winner);
    }

    #[test]
    fn test_normalize_turns_winner_into_leader_while_counting() {
        let mut candidates = vec![
            Candidate { is_winner: true, ..Candidate::new("A", "bnp", 300) },
            Candidate::new("B", "ncp", 100),
        ];
        normalize_candidates(&mut candidates, ConstituencyStatus::Counting);

        assert!(!candidates[0].is_winner);
        assert!(candidates[0].is_leading);
        assert!(!candidates[1].is_leading);
    }

    #[test]
    fn test_win_margin_uses_top_two() {
        let candidates = vec![
            Candidate::new("A", "bnp", 500),
            Candidate::new("B", "ncp", 320),
            Candidate::new("C", "jp-ershad", 10),
        ];
        assert_eq!(win_margin(&candidates), 180);
        assert_eq!(win_margin(&candidates[..1]), 0);
    }

    #[test]
    fn test_candidate_merge_key_falls_back_to_name() {
        assert_eq!(Candidate::new("Rahim Uddin", "", 1).merge_key(), "rahim uddin");
        assert_eq!(Candidate::new("Rahim Uddin", "BNP", 1).merge_key(), "bnp");
    }
}
