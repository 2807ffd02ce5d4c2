//! Tolerant parsing of extraction answers
//!
//! Answers are prose that should contain one JSON object. The first balanced
//! top-level object is taken; anything around it (code fences, commentary)
//! is ignored. Untyped JSON never leaves this module.

use serde_json::Value;
use tally_common::catalog::TOTAL_SEATS;
use tally_common::models::{Candidate, ConstituencyStatus, ReportedConstituency, StatedConfidence};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EnvelopeError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("response JSON has no `{0}` array")]
    MissingArray(&'static str),
}

/// Parsed results answer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultsEnvelope {
    pub results: Vec<ReportedConstituency>,
    /// Entries discarded for lacking a usable constituency number
    pub dropped: usize,
    pub sources_used: Vec<String>,
    pub confidence: StatedConfidence,
}

/// News entry before de-duplication and categorization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawNewsItem {
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub source_url: Option<String>,
    pub category: String,
    pub importance: String,
}

/// Slice of the first balanced top-level `{...}` in `text`
///
/// Braces inside JSON strings (including escaped quotes) do not count.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_object(text: &str) -> Result<Value, EnvelopeError> {
    let raw = extract_json_object(text).ok_or(EnvelopeError::NoJson)?;
    serde_json::from_str(raw).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))
}

/// Parse a `{results: [...], sourcesUsed?, confidenceLevel?}` answer
pub fn parse_results_envelope(text: &str) -> Result<ResultsEnvelope, EnvelopeError> {
    let root = parse_object(text)?;
    let entries = root
        .get("results")
        .and_then(Value::as_array)
        .ok_or(EnvelopeError::MissingArray("results"))?;

    let mut envelope = ResultsEnvelope {
        sources_used: string_list(root.get("sourcesUsed")),
        confidence: root
            .get("confidenceLevel")
            .and_then(Value::as_str)
            .map(StatedConfidence::parse_lenient)
            .unwrap_or_default(),
        ..Default::default()
    };

    for entry in entries {
        match reported_constituency(entry) {
            Some(report) => envelope.results.push(report),
            None => envelope.dropped += 1,
        }
    }

    Ok(envelope)
}

/// Parse a `{news: [...]}` answer
pub fn parse_news_envelope(text: &str) -> Result<Vec<RawNewsItem>, EnvelopeError> {
    let root = parse_object(text)?;
    let entries = root
        .get("news")
        .and_then(Value::as_array)
        .ok_or(EnvelopeError::MissingArray("news"))?;

    Ok(entries
        .iter()
        .map(|entry| RawNewsItem {
            headline: text_field(entry, &["headline", "title"]),
            summary: text_field(entry, &["summary"]),
            source: text_field(entry, &["source"]),
            source_url: Some(text_field(entry, &["sourceUrl", "url"])).filter(|u| !u.is_empty()),
            category: text_field(entry, &["category"]),
            importance: text_field(entry, &["importance"]),
        })
        .collect())
}

fn reported_constituency(entry: &Value) -> Option<ReportedConstituency> {
    let number = count_field(entry, &["constituencyNumber", "number"])?;
    if number == 0 || number > TOTAL_SEATS as u64 {
        return None;
    }

    let candidates = entry
        .get("candidates")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(candidate).collect())
        .unwrap_or_default();

    Some(ReportedConstituency {
        number: number as u32,
        name: text_field(entry, &["constituencyName", "name"]),
        division: text_field(entry, &["division"]),
        district: text_field(entry, &["district"]),
        status: entry
            .get("status")
            .and_then(Value::as_str)
            .and_then(ConstituencyStatus::parse_lenient),
        candidates,
        total_votes: count_field(entry, &["totalVotes"]).unwrap_or(0),
        win_margin: count_field(entry, &["winMargin"]).unwrap_or(0),
    })
}

fn candidate(entry: &Value) -> Option<Candidate> {
    let name = text_field(entry, &["name"]);
    let party = text_field(entry, &["partyId", "party"]).to_lowercase();
    if name.is_empty() && party.is_empty() {
        return None;
    }

    Some(Candidate {
        name,
        party_id: party,
        votes: count_field(entry, &["votes"]).unwrap_or(0),
        is_winner: flag_field(entry, "isWinner"),
        is_leading: flag_field(entry, "isLeading"),
    })
}

fn text_field(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| entry.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Non-negative integer from a number or a numeric string ("12,345")
fn count_field(entry: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match entry.get(*key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().replace(',', "").parse::<u64>().ok(),
        _ => None,
    })
}

fn flag_field(entry: &Value, key: &str) -> bool {
    match entry.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_object_ignores_surrounding_prose() {
        let text = "Here you go:\n```json\n{\"results\": []}\n```\nDone {not json}";
        assert_eq!(extract_json_object(text), Some("{\"results\": []}"));
    }

    #[test]
    fn test_extract_object_skips_braces_in_strings() {
        let text = r#"{"a": "x } y", "b": {"c": "\"}"}} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": "x } y", "b": {"c": "\"}"}}"#)
        );
    }

    #[test]
    fn test_unbalanced_object_is_no_json() {
        assert_eq!(extract_json_object("{\"results\": ["), None);
        assert_eq!(parse_results_envelope("no json here"), Err(EnvelopeError::NoJson));
    }

    #[test]
    fn test_missing_results_array() {
        assert_eq!(
            parse_results_envelope("{\"data\": []}"),
            Err(EnvelopeError::MissingArray("results"))
        );
        assert_eq!(
            parse_results_envelope("{\"results\": {}}"),
            Err(EnvelopeError::MissingArray("results"))
        );
    }

    #[test]
    fn test_invalid_json_reported() {
        let err = parse_results_envelope("{\"results\": [1,]}").unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidJson(_)));
    }

    #[test]
    fn test_parses_results_with_tolerant_fields() {
        let text = r#"
        {
          "results": [
            {
              "constituencyNumber": "42",
              "constituencyName": "Dhaka-5",
              "division": "Dhaka",
              "status": "Declared",
              "candidates": [
                {"name": "A", "party": "BNP", "votes": "51,200", "isWinner": true},
                {"name": "B", "partyId": "jamaat", "votes": 40100.0}
              ],
              "totalVotes": 91300
            },
            {"constituencyName": "no number"},
            {"constituencyNumber": 999}
          ],
          "sourcesUsed": ["thedailystar.net", " "],
          "confidenceLevel": "HIGH"
        }"#;

        let envelope = parse_results_envelope(text).unwrap();
        assert_eq!(envelope.results.len(), 1);
        assert_eq!(envelope.dropped, 2);
        assert_eq!(envelope.sources_used, vec!["thedailystar.net".to_string()]);
        assert_eq!(envelope.confidence, StatedConfidence::High);

        let report = &envelope.results[0];
        assert_eq!(report.number, 42);
        assert_eq!(report.status, Some(ConstituencyStatus::Declared));
        assert_eq!(report.candidates[0].party_id, "bnp");
        assert_eq!(report.candidates[0].votes, 51_200);
        assert!(report.candidates[0].is_winner);
        assert_eq!(report.candidates[1].votes, 40_100);
        assert_eq!(report.total_votes, 91_300);
    }

    #[test]
    fn test_missing_optional_envelope_fields_default() {
        let envelope = parse_results_envelope("{\"results\": []}").unwrap();
        assert!(envelope.sources_used.is_empty());
        assert_eq!(envelope.confidence, StatedConfidence::Medium);
    }

    #[test]
    fn test_parses_news_envelope() {
        let items = parse_news_envelope(
            r#"{"news": [{"headline": "Turnout high", "summary": "s", "source": "BSS",
                "url": "https://bssnews.net/x", "category": "breaking", "importance": "high"}]}"#,
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].headline, "Turnout high");
        assert_eq!(items[0].source_url.as_deref(), Some("https://bssnews.net/x"));
        assert_eq!(items[0].importance, "high");
        assert_eq!(
            parse_news_envelope("{\"results\": []}"),
            Err(EnvelopeError::MissingArray("news"))
        );
    }
}
