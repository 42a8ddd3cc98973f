use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::prompts::truncate_chars;
use crate::config::UpstreamConfig;

/// Longest slice of an upstream error body that is written to the log
const LOGGED_BODY_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Failed to reach completion API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion API rate limited the request")]
    RateLimited,

    #[error("Completion API returned HTTP {0}")]
    Status(u16),

    #[error("Invalid completion API response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    /// Request with a single user message
    pub fn user(model: impl Into<String>, max_tokens: u32, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: content.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Usage,
}

impl CompletionResponse {
    /// All text segments joined in order; non-text segments count as empty
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.is_text())
            .filter_map(|block| block.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentBlock {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ContentBlock {
    /// Untyped blocks are treated as text
    fn is_text(&self) -> bool {
        matches!(self.kind.as_deref(), None | Some("text"))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// A large-language-model completion backend
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// Client for the Anthropic Messages API
/// https://docs.anthropic.com/en/api/messages
pub struct AnthropicClient {
    client: Client,
    api_url: String,
    api_version: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(client: Client, upstream: &UpstreamConfig, api_key: &str) -> Self {
        Self {
            client,
            api_url: upstream.api_url.clone(),
            api_version: upstream.api_version.clone(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        tracing::debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate_chars(&body, LOGGED_BODY_CHARS),
                "Completion API error"
            );
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(CompletionError::RateLimited);
            }
            return Err(CompletionError::Status(status.as_u16()));
        }

        let data: CompletionResponse = serde_json::from_str(&body).inspect_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate_chars(&body, LOGGED_BODY_CHARS),
                "Undecodable completion API response"
            );
        })?;

        tracing::debug!(
            status = %status,
            segments = data.content.len(),
            "Received completion response"
        );

        Ok(data)
    }
}
