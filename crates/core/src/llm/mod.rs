pub mod error;
pub mod json;
pub mod openai;

use crate::domain::chat::ChatMessage;
use crate::llm::error::CompletionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One completion exchange. Only the top choice is used by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub message: ChatMessage,
}

impl ChatCompletion {
    pub fn from_message(message: ChatMessage) -> Self {
        Self {
            choices: vec![CompletionChoice { message }],
        }
    }

    pub fn into_top_message(self, provider: &'static str) -> Result<ChatMessage, CompletionError> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| CompletionError::new(provider, "choices", "completion returned no choices"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploaded,
    Processed,
    Error,
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Processed => "processed",
            FileStatus::Error => "error",
            FileStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    pub status: FileStatus,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Single non-streaming completion over an ordered conversation.
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<ChatCompletion, CompletionError>;

    /// Single-turn completion with previously uploaded files attached to the prompt.
    async fn complete_with_files(
        &self,
        prompt: &str,
        file_ids: &[String],
    ) -> Result<ChatCompletion, CompletionError>;

    async fn upload_file(
        &self,
        name: &str,
        path: &Path,
        purpose: &str,
    ) -> Result<UploadedFile, CompletionError>;

    /// Current processing state of an uploaded file.
    async fn file_status(&self, file_id: &str) -> Result<UploadedFile, CompletionError>;
}
