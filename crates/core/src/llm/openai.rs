use crate::config::Settings;
use crate::domain::chat::{ChatMessage, Role};
use crate::llm::error::CompletionError;
use crate::llm::{ChatCompletion, CompletionChoice, LlmClient, UploadedFile};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout_secs,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: config.api_key,
            base_url: config.base_url,
            model: config.model,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(OpenAiConfig::from_settings(settings)?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap, CompletionError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| CompletionError::new(PROVIDER, "headers", e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn read_response<T: DeserializeOwned>(
        res: reqwest::Response,
        stage: &'static str,
    ) -> Result<T, CompletionError> {
        let status = res.status();
        let text = res.text().await.map_err(|e| {
            CompletionError::new(PROVIDER, stage, format!("failed to read response body: {e}"))
        })?;
        if !status.is_success() {
            return Err(CompletionError::new(PROVIDER, "http", format!("status={status}"))
                .with_raw_output(text));
        }

        serde_json::from_str::<T>(&text).map_err(|e| {
            CompletionError::new(PROVIDER, "decode", format!("unexpected response shape: {e}"))
                .with_raw_output(text)
        })
    }

    async fn create_chat_completion(
        &self,
        req: CreateChatCompletionRequest<'_>,
    ) -> Result<ChatCompletion, CompletionError> {
        let res = self
            .http
            .post(self.url("chat/completions"))
            .headers(self.headers()?)
            .json(&req)
            .send()
            .await
            .map_err(|e| CompletionError::new(PROVIDER, "request", e.to_string()))?;

        let parsed: CreateChatCompletionResponse = Self::read_response(res, "completion").await?;
        Ok(parsed.into_completion())
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, conversation: &[ChatMessage]) -> Result<ChatCompletion, CompletionError> {
        let req = CreateChatCompletionRequest {
            model: &self.model,
            messages: conversation.iter().map(WireMessage::from_chat).collect(),
        };
        tracing::debug!(model = %self.model, turns = conversation.len(), "chat completion request");
        self.create_chat_completion(req).await
    }

    async fn complete_with_files(
        &self,
        prompt: &str,
        file_ids: &[String],
    ) -> Result<ChatCompletion, CompletionError> {
        let mut parts = Vec::with_capacity(file_ids.len() + 1);
        parts.push(ContentPart::Text { text: prompt });
        parts.extend(file_ids.iter().map(|id| ContentPart::File {
            file: FileRef { file_id: id },
        }));

        let req = CreateChatCompletionRequest {
            model: &self.model,
            messages: vec![WireMessage {
                role: Role::User,
                content: WireContent::Parts(parts),
            }],
        };
        tracing::debug!(model = %self.model, files = file_ids.len(), "chat completion request with files");
        self.create_chat_completion(req).await
    }

    async fn upload_file(
        &self,
        name: &str,
        path: &Path,
        purpose: &str,
    ) -> Result<UploadedFile, CompletionError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            CompletionError::new(PROVIDER, "read_file", format!("{}: {e}", path.display()))
        })?;

        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(name.to_string()),
            );

        let res = self
            .http
            .post(self.url("files"))
            .headers(self.headers()?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CompletionError::new(PROVIDER, "request", e.to_string()))?;

        Self::read_response(res, "upload").await
    }

    async fn file_status(&self, file_id: &str) -> Result<UploadedFile, CompletionError> {
        let res = self
            .http
            .get(self.url(&format!("files/{file_id}")))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| CompletionError::new(PROVIDER, "request", e.to_string()))?;

        Self::read_response(res, "file_status").await
    }
}

#[derive(Debug, Serialize)]
struct CreateChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: WireContent<'a>,
}

impl<'a> WireMessage<'a> {
    fn from_chat(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role,
            content: WireContent::Text(&message.content),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    File { file: FileRef<'a> },
}

#[derive(Debug, Serialize)]
struct FileRef<'a> {
    file_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateChatCompletionResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

impl CreateChatCompletionResponse {
    fn into_completion(self) -> ChatCompletion {
        ChatCompletion {
            choices: self
                .choices
                .into_iter()
                .map(|c| CompletionChoice {
                    message: ChatMessage::new(c.message.role, c.message.content.unwrap_or_default()),
                })
                .collect(),
        }
    }
}
