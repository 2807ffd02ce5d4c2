//! Trust scoring
//!
//! Converts the signals attached to one report into a 0-100 confidence value
//! from six weighted factors. Scoring is pure: the same report, prior record,
//! cited sources and stated confidence always produce the same score.

use serde::Serialize;
use tally_common::models::{ConstituencyRecord, ReportedConstituency, StatedConfidence};

/// Minimum score a report needs to be published without review
pub const AUTO_PUBLISH_THRESHOLD: u8 = 65;

pub const WEIGHT_SOURCE_AGREEMENT: f64 = 0.25;
pub const WEIGHT_CROSS_SOURCE: f64 = 0.20;
pub const WEIGHT_RELIABILITY: f64 = 0.20;
pub const WEIGHT_COMPLETENESS: f64 = 0.15;
pub const WEIGHT_TEMPORAL: f64 = 0.10;
pub const WEIGHT_STATED_CONFIDENCE: f64 = 0.10;

/// Outlets and catalog names counted by the cross-source factor
const RELIABLE_SOURCES: &[&str] = &[
    "ec.org.bd",
    "bssnews.net",
    "bdnews24.com",
    "thedailystar.net",
    "prothomalo.com",
    "dhakatribune.com",
    "newagebd.net",
    "samakal.com",
    "bbc.com",
    "aljazeera.com",
    "reuters.com",
    "apnews.com",
    "ndtv.com",
    "indiatoday.in",
    "ec / bss (official)",
    "the daily star",
    "prothom alo",
    "dhaka tribune",
    "international media",
];

/// Reliability tiers, checked in order against the cited sources
const RELIABILITY_TIERS: &[(&[&str], u8)] = &[
    (&["ec.org.bd", "bssnews", "official"], 100),
    (
        &[
            "bdnews24",
            "dailystar",
            "daily star",
            "prothomalo",
            "prothom alo",
            "dhakatribune",
            "dhaka tribune",
        ],
        85,
    ),
    (&["bbc", "aljazeera", "reuters", "apnews"], 80),
    (&["ndtv", "indiatoday", "international"], 70),
];

const UNRECOGNIZED_RELIABILITY: u8 = 40;

/// Individual factor values, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustFactors {
    pub source_agreement: u8,
    pub cross_source_agreement: u8,
    pub source_reliability: u8,
    pub data_completeness: u8,
    pub temporal_consistency: u8,
    pub stated_confidence: u8,
}

impl TrustFactors {
    /// Weighted sum, rounded and clamped to 0-100
    pub fn weighted_score(&self) -> u8 {
        let total = self.source_agreement as f64 * WEIGHT_SOURCE_AGREEMENT
            + self.cross_source_agreement as f64 * WEIGHT_CROSS_SOURCE
            + self.source_reliability as f64 * WEIGHT_RELIABILITY
            + self.data_completeness as f64 * WEIGHT_COMPLETENESS
            + self.temporal_consistency as f64 * WEIGHT_TEMPORAL
            + self.stated_confidence as f64 * WEIGHT_STATED_CONFIDENCE;
        total.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrustAssessment {
    pub score: u8,
    pub factors: TrustFactors,
}

/// Coarse label shown next to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLabel {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

pub fn trust_label(score: u8) -> TrustLabel {
    match score {
        90..=u8::MAX => TrustLabel::VeryHigh,
        75..=89 => TrustLabel::High,
        55..=74 => TrustLabel::Moderate,
        35..=54 => TrustLabel::Low,
        _ => TrustLabel::VeryLow,
    }
}

/// Six-factor trust scorer
#[derive(Debug, Clone, Copy)]
pub struct TrustScorer {
    threshold: u8,
}

impl Default for TrustScorer {
    fn default() -> Self {
        Self {
            threshold: AUTO_PUBLISH_THRESHOLD,
        }
    }
}

impl TrustScorer {
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn should_auto_publish(&self, score: u8) -> bool {
        score >= self.threshold
    }

    /// Score one report against the current canonical record (if any)
    pub fn score(
        &self,
        report: &ReportedConstituency,
        prior: Option<&ConstituencyRecord>,
        sources_used: &[String],
        confidence: StatedConfidence,
    ) -> TrustAssessment {
        let cited = distinct_sources(sources_used);

        let factors = TrustFactors {
            source_agreement: source_agreement(cited.len()),
            cross_source_agreement: cross_source_agreement(&cited),
            source_reliability: source_reliability(&cited),
            data_completeness: data_completeness(report),
            temporal_consistency: temporal_consistency(report, prior),
            stated_confidence: stated_confidence(confidence),
        };

        TrustAssessment {
            score: factors.weighted_score(),
            factors,
        }
    }
}

/// Lowercased, trimmed, de-duplicated, blank entries dropped
fn distinct_sources(sources_used: &[String]) -> Vec<String> {
    let mut cited: Vec<String> = Vec::new();
    for source in sources_used {
        let normalized = source.trim().to_lowercase();
        if !normalized.is_empty() && !cited.contains(&normalized) {
            cited.push(normalized);
        }
    }
    cited
}

fn source_agreement(distinct: usize) -> u8 {
    match distinct {
        0 | 1 => 40,
        2 => 75,
        _ => 100,
    }
}

fn cross_source_agreement(cited: &[String]) -> u8 {
    let reliable_hits = cited
        .iter()
        .filter(|source| {
            RELIABLE_SOURCES
                .iter()
                .any(|known| source.contains(known) || known.contains(source.as_str()))
        })
        .count();

    match reliable_hits {
        0 => 20,
        1 => 50,
        2 => 80,
        _ => 100,
    }
}

fn source_reliability(cited: &[String]) -> u8 {
    RELIABILITY_TIERS
        .iter()
        .find(|(markers, _)| {
            cited
                .iter()
                .any(|source| markers.iter().any(|marker| source.contains(marker)))
        })
        .map(|(_, value)| *value)
        .unwrap_or(UNRECOGNIZED_RELIABILITY)
}

fn data_completeness(report: &ReportedConstituency) -> u8 {
    let mut value = 0u8;
    if !report.name.trim().is_empty() {
        value += 20;
    }
    if report.number > 0 {
        value += 20;
    }
    if !report.candidates.is_empty() {
        value += 25;
    }
    if report.total_votes > 0 {
        value += 20;
    }
    if report.status.is_some() {
        value += 15;
    }
    value
}

fn temporal_consistency(report: &ReportedConstituency, prior: Option<&ConstituencyRecord>) -> u8 {
    let Some(prior) = prior else {
        return 75;
    };

    if let Some(status) = report.status {
        if prior.status.regresses_to(status) {
            return 0;
        }
    }

    if prior.total_votes == 0 {
        return 75;
    }
    if report.total_votes == 0 {
        return 0;
    }
    if report.total_votes >= prior.total_votes {
        return 100;
    }

    let decrease = (prior.total_votes - report.total_votes) as f64 / prior.total_votes as f64;
    if decrease < 0.05 {
        70
    } else if decrease < 0.15 {
        30
    } else {
        0
    }
}

fn stated_confidence(confidence: StatedConfidence) -> u8 {
    match confidence {
        StatedConfidence::High => 90,
        StatedConfidence::Medium => 60,
        StatedConfidence::Low => 30,
        StatedConfidence::Unknown => 50,
    }
}
