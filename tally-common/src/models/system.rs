//! Runtime status, summary, ticker and news documents

use serde::{Deserialize, Serialize};

use super::report::SourceTier;

/// Real-world phase of election day driving the polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPhase {
    #[default]
    PreVoting,
    Voting,
    EarlyResults,
    PeakResults,
    LateResults,
    Cleanup,
    Completed,
}

impl CollectionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionPhase::PreVoting => "pre_voting",
            CollectionPhase::Voting => "voting",
            CollectionPhase::EarlyResults => "early_results",
            CollectionPhase::PeakResults => "peak_results",
            CollectionPhase::LateResults => "late_results",
            CollectionPhase::Cleanup => "cleanup",
            CollectionPhase::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CollectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime health of one catalog source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub id: String,
    pub name: String,
    pub tier: SourceTier,
    pub is_active: bool,
    pub last_fetch_time: Option<i64>,
    pub last_success_time: Option<i64>,
    pub fetch_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Constituencies returned by the last successful fetch
    pub constituencies_reported: usize,
    /// Rolling average latency in milliseconds
    pub avg_response_ms: f64,
    pub last_error: Option<String>,
}

/// Singleton collector status document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStatus {
    pub is_collecting: bool,
    pub last_fetch_time: Option<i64>,
    pub next_fetch_time: Option<i64>,
    pub api_calls_today: u64,
    pub errors_today: u64,
    pub seats_declared: u32,
    pub seats_total: u32,
    pub collection_phase: CollectionPhase,
    pub active_sources: usize,
    pub total_conflicts: usize,
    pub resolved_conflicts: usize,
    pub auto_news_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyStanding {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub seats_won: u32,
    pub seats_leading: u32,
    pub total_votes: u64,
}

/// Singleton national summary document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ElectionSummary {
    pub total_seats: u32,
    pub seats_declared: u32,
    pub seats_remaining: u32,
    pub total_votes_counted: u64,
    pub avg_turnout: f64,
    pub parties: Vec<PartyStanding>,
    pub leading_party: Option<String>,
    pub phase: CollectionPhase,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    ResultDeclared,
    VoteUpdate,
    LeadChange,
    Correction,
    News,
}

/// Ticker entry shown on the live feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionUpdate {
    pub id: String,
    pub constituency_id: String,
    pub constituency_name: String,
    pub timestamp: i64,
    pub kind: UpdateKind,
    pub message: String,
    pub trust_score: u8,
    pub source: String,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Breaking,
    Result,
    Analysis,
    Incident,
    General,
}

impl NewsCategory {
    /// Unknown categories fall back to `general`
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "breaking" => NewsCategory::Breaking,
            "result" => NewsCategory::Result,
            "analysis" => NewsCategory::Analysis,
            "incident" => NewsCategory::Incident,
            _ => NewsCategory::General,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub source: String,
    #[serde(default)]
    pub source_url: Option<String>,
    pub timestamp: i64,
    pub category: NewsCategory,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferendumStatus {
    #[default]
    NotStarted,
    Counting,
    Declared,
}

/// Singleton referendum tally document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferendumState {
    pub total_yes: u64,
    pub total_no: u64,
    pub total_cast: u64,
    pub total_eligible: u64,
    pub percent_yes: f64,
    pub percent_no: f64,
    pub centers_reported: u32,
    pub total_centers: u32,
    pub status: ReferendumStatus,
    pub trust_score: u8,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemErrorKind {
    SourceFetch,
    Parsing,
    RateLimit,
    Network,
    Validation,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemErrorStatus {
    Active,
    Resolved,
    Ignored,
}

impl SystemErrorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemErrorStatus::Active => "active",
            SystemErrorStatus::Resolved => "resolved",
            SystemErrorStatus::Ignored => "ignored",
        }
    }
}

/// Operator-facing error log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemError {
    pub id: String,
    pub timestamp: i64,
    pub kind: SystemErrorKind,
    #[serde(default)]
    pub source_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    pub status: SystemErrorStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_category_fallback() {
        assert_eq!(NewsCategory::parse_lenient("Breaking"), NewsCategory::Breaking);
        assert_eq!(NewsCategory::parse_lenient("gossip"), NewsCategory::General);
    }

    #[test]
    fn test_status_document_tolerates_missing_fields() {
        let status: SystemStatus =
            serde_json::from_str(r#"{"isCollecting": true, "collectionPhase": "peak_results"}"#)
                .unwrap();
        assert!(status.is_collecting);
        assert_eq!(status.collection_phase, CollectionPhase::PeakResults);
        assert_eq!(status.api_calls_today, 0);
    }
}
