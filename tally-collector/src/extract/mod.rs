//! Text extraction collaborator
//!
//! A [`TextExtractor`] turns a natural-language instruction plus a JSON output
//! schema into free text (expected to contain a JSON object) and the URLs it
//! cited. Parsing that text into typed reports lives in [`envelope`].

pub mod envelope;
pub mod search_client;

use thiserror::Error;

pub use envelope::{
    extract_json_object, parse_news_envelope, parse_results_envelope, EnvelopeError,
    RawNewsItem, ResultsEnvelope,
};
pub use search_client::SearchAnswerClient;

/// Text returned by one extraction call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    /// URLs the collaborator consulted
    pub citations: Vec<String>,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// Failure to obtain text at all (parse failures are [`EnvelopeError`])
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Remote API answered with an error status or unusable body
    #[error("API error: {0}")]
    Api(String),

    /// Request exceeded its time budget
    #[error("Extraction timed out after {0} s")]
    Timeout(u64),

    /// No API key or endpoint configured
    #[error("Extractor not configured: {0}")]
    NotConfigured(String),
}

/// Extraction collaborator trait
///
/// Implementations must be safe to call concurrently; the source registry
/// fans out one call per selected source.
#[async_trait::async_trait]
pub trait TextExtractor: Send + Sync {
    /// Name for logging and provenance
    fn name(&self) -> &'static str;

    /// Run one instruction and return the raw answer text
    async fn extract(&self, instruction: &str, schema: &str)
        -> Result<ExtractedText, ExtractionError>;
}

/// Extractor used when no API key is configured
///
/// Every call fails with [`ExtractionError::NotConfigured`], so fetch attempts
/// surface in source health and the system error log instead of the service
/// refusing to start.
pub struct UnconfiguredExtractor {
    reason: String,
}

impl UnconfiguredExtractor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl TextExtractor for UnconfiguredExtractor {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn extract(
        &self,
        _instruction: &str,
        _schema: &str,
    ) -> Result<ExtractedText, ExtractionError> {
        Err(ExtractionError::NotConfigured(self.reason.clone()))
    }
}
