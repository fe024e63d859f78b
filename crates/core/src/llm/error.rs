use serde_json::Value;
use std::fmt;

/// A completion-provider exchange failed: transport, HTTP status, decoding, or an empty reply.
#[derive(Debug, Clone)]
pub struct CompletionError {
    pub provider: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl CompletionError {
    pub fn new(provider: &'static str, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            detail: detail.into(),
            raw_output: None,
            raw_response_json: None,
        }
    }

    pub fn with_raw_output(mut self, raw_output: impl Into<String>) -> Self {
        let raw_output = raw_output.into();
        self.raw_response_json = serde_json::from_str::<Value>(&raw_output).ok();
        self.raw_output = Some(raw_output);
        self
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for CompletionError {}
