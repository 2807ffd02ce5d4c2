//! Search-answer HTTP client
//!
//! Sends the instruction and schema as a search query with answer generation
//! enabled and returns the generated answer plus the result URLs. Calls are
//! rate limited client-side so a burst of concurrent source fetches stays
//! within the API quota.

use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_common::config::SearchConfig;
use tracing::debug;

use super::{ExtractedText, ExtractionError, TextExtractor};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: String,
    search_depth: &'static str,
    topic: &'static str,
    include_answer: bool,
    max_results: u8,
    days: u8,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: String,
}

pub struct SearchAnswerClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl SearchAnswerClient {
    pub fn new(api_key: String, config: &SearchConfig) -> Result<Self, ExtractionError> {
        if api_key.trim().is_empty() {
            return Err(ExtractionError::NotConfigured("empty API key".to_string()));
        }

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .unwrap_or(NonZeroU32::MIN);
        let rate_limiter = governor::RateLimiter::direct(governor::Quota::per_minute(per_minute));

        let client = reqwest::Client::builder()
            .user_agent(concat!("tally-collector/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
            rate_limiter,
        })
    }
}

#[async_trait::async_trait]
impl TextExtractor for SearchAnswerClient {
    fn name(&self) -> &'static str {
        "search-answer"
    }

    async fn extract(
        &self,
        instruction: &str,
        schema: &str,
    ) -> Result<ExtractedText, ExtractionError> {
        self.rate_limiter.until_ready().await;

        let request = SearchRequest {
            api_key: &self.api_key,
            query: format!("{}\n\n{}", instruction, schema),
            search_depth: "advanced",
            topic: "news",
            include_answer: true,
            max_results: 8,
            days: 1,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout(self.timeout_secs)
                } else {
                    ExtractionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Api(format!("search API returned {}", status)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Api(format!("unreadable search response: {}", e)))?;

        let citations: Vec<String> = body.results.into_iter().map(|hit| hit.url).collect();
        debug!(citations = citations.len(), "Search answer received");

        match body.answer {
            Some(text) if !text.trim().is_empty() => Ok(ExtractedText { text, citations }),
            _ => Err(ExtractionError::Api("search response had no answer".to_string())),
        }
    }
}
