//! Per-source claims extracted during a collection cycle

use serde::{Deserialize, Serialize};

use super::constituency::{Candidate, ConstituencyStatus};

/// Source tier (lower number = more authoritative)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SourceTier {
    /// Election commission / state news agency
    Official = 1,
    /// Major national press
    MajorPress = 2,
    /// International press
    International = 3,
    /// Manual or admin entry
    Manual = 4,
}

impl SourceTier {
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Weight applied when merging candidate votes across sources
    pub fn merge_weight(self) -> f64 {
        match self {
            SourceTier::Official => 1.0,
            SourceTier::MajorPress => 0.8,
            SourceTier::International => 0.5,
            SourceTier::Manual => 1.0,
        }
    }
}

impl From<SourceTier> for u8 {
    fn from(tier: SourceTier) -> u8 {
        tier.number()
    }
}

impl TryFrom<u8> for SourceTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SourceTier::Official),
            2 => Ok(SourceTier::MajorPress),
            3 => Ok(SourceTier::International),
            4 => Ok(SourceTier::Manual),
            other => Err(format!("invalid source tier: {}", other)),
        }
    }
}

/// Self-reported confidence attached by the extraction agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatedConfidence {
    High,
    #[default]
    Medium,
    Low,
    Unknown,
}

impl StatedConfidence {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => StatedConfidence::High,
            "medium" => StatedConfidence::Medium,
            "low" => StatedConfidence::Low,
            _ => StatedConfidence::Unknown,
        }
    }
}

/// Constituency fields as claimed by one source
///
/// Same shape as a canonical record minus trust and provenance. Any field may
/// be missing from extracted text, hence the optional status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportedConstituency {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub division: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub status: Option<ConstituencyStatus>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub win_margin: u64,
}

impl ReportedConstituency {
    /// Party of the first candidate flagged as winner or leader
    pub fn leading_party(&self) -> Option<&str> {
        self.candidates
            .iter()
            .find(|c| c.is_winner || c.is_leading)
            .map(|c| c.party_id.as_str())
    }
}

/// One source's claim about one constituency in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source_id: String,
    pub source_name: String,
    pub tier: SourceTier,
    pub constituency: ReportedConstituency,
    pub confidence: StatedConfidence,
    pub sources_used: Vec<String>,
    pub fetched_at: i64,
}
