//! Scripted TextExtractor
//!
//! Answers are chosen by the first rule whose needle occurs in the
//! instruction. Unmatched instructions get an empty results envelope.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tally_collector::extract::{ExtractedText, ExtractionError, TextExtractor};

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

#[derive(Default)]
pub struct ScriptedExtractor {
    rules: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` to instructions containing `needle`
    pub fn respond(self, needle: &str, text: impl Into<String>) -> Self {
        self.push(needle, Reply::Text(text.into()));
        self
    }

    /// Fail instructions containing `needle` with a network error
    pub fn fail(self, needle: &str, message: &str) -> Self {
        self.push(needle, Reply::Fail(message.to_string()));
        self
    }

    /// Never answer instructions containing `needle`
    pub fn hang(self, needle: &str) -> Self {
        self.push(needle, Reply::Hang);
        self
    }

    /// Replace the reply for `needle` after construction
    pub fn set_reply(&self, needle: &str, text: impl Into<String>) {
        let mut rules = self.rules.lock().unwrap();
        rules.retain(|(n, _)| n != needle);
        rules.insert(0, (needle.to_string(), Reply::Text(text.into())));
    }

    fn push(&self, needle: &str, reply: Reply) {
        self.rules.lock().unwrap().push((needle.to_string(), reply));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn extract(
        &self,
        instruction: &str,
        _schema: &str,
    ) -> Result<ExtractedText, ExtractionError> {
        self.calls.lock().unwrap().push(instruction.to_string());

        let reply = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| instruction.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Text(text)) => Ok(ExtractedText::new(text)),
            Some(Reply::Fail(message)) => Err(ExtractionError::Network(message)),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ExtractionError::Timeout(3600))
            }
            None => Ok(ExtractedText::new(r#"{"results": []}"#)),
        }
    }
}
