//! Operator-entered data: referendum tallies and manual news items

use serde::Deserialize;
use tally_common::models::{new_id, NewsCategory, NewsItem, ReferendumState, ReferendumStatus};
use tally_common::time::now_millis;
use tally_common::{Error, Result};
use tracing::info;

use crate::store::{documents, ElectionStore};

/// Eligible referendum voters when the operator does not give a figure
pub const DEFAULT_REFERENDUM_ELIGIBLE: u64 = 127_600_000;

const ADMIN_NEWS_SOURCE: &str = "Admin";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferendumInput {
    pub total_yes: u64,
    pub total_no: u64,
    #[serde(default)]
    pub total_eligible: Option<u64>,
    #[serde(default)]
    pub centers_reported: u32,
    #[serde(default)]
    pub total_centers: u32,
    #[serde(default)]
    pub status: ReferendumStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualNewsInput {
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Percent of `total`, two decimals
fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Replace the referendum tally with operator figures
pub async fn update_referendum(
    store: &dyn ElectionStore,
    input: ReferendumInput,
) -> Result<ReferendumState> {
    if input.total_centers > 0 && input.centers_reported > input.total_centers {
        return Err(Error::InvalidInput(format!(
            "centers reported ({}) exceeds total centers ({})",
            input.centers_reported, input.total_centers
        )));
    }

    let total_cast = input.total_yes + input.total_no;
    let state = ReferendumState {
        total_yes: input.total_yes,
        total_no: input.total_no,
        total_cast,
        total_eligible: input.total_eligible.unwrap_or(DEFAULT_REFERENDUM_ELIGIBLE),
        percent_yes: percent_of(input.total_yes, total_cast),
        percent_no: percent_of(input.total_no, total_cast),
        centers_reported: input.centers_reported,
        total_centers: input.total_centers,
        status: input.status,
        trust_score: 100,
        last_updated: now_millis(),
    };

    store
        .merge_document(documents::REFERENDUM, serde_json::to_value(&state)?)
        .await?;
    info!(yes = state.total_yes, no = state.total_no, "Referendum tally updated");
    Ok(state)
}

/// Publish an operator-written news item (always verified)
pub async fn add_manual_news(store: &dyn ElectionStore, input: ManualNewsInput) -> Result<NewsItem> {
    let headline = input.headline.trim();
    if headline.is_empty() {
        return Err(Error::InvalidInput("headline is required".to_string()));
    }

    let item = NewsItem {
        id: new_id(),
        headline: headline.to_string(),
        summary: input.summary.trim().to_string(),
        source: input
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ADMIN_NEWS_SOURCE.to_string()),
        source_url: input.source_url.filter(|u| !u.trim().is_empty()),
        timestamp: now_millis(),
        category: input
            .category
            .as_deref()
            .map(NewsCategory::parse_lenient)
            .unwrap_or(NewsCategory::General),
        is_verified: true,
    };

    store.add_news(&item).await?;
    info!(news_id = %item.id, "Manual news item published");
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_two_decimals() {
        assert_eq!(percent_of(1, 3), 33.33);
        assert_eq!(percent_of(2, 3), 66.67);
        assert_eq!(percent_of(5, 0), 0.0);
    }

    #[test]
    fn test_referendum_input_defaults() {
        let input: ReferendumInput =
            serde_json::from_str(r#"{"totalYes": 10, "totalNo": 5}"#).unwrap();
        assert_eq!(input.total_eligible, None);
        assert_eq!(input.status, ReferendumStatus::NotStarted);
    }
}
