//! Assistant REST Client
//!
//! HTTP client for the external assistant that answers `chat_message`
//! questions. A `chat_response` is always produced: when the upstream
//! is unconfigured, unreachable, or slow, the static air-quality
//! guidance fallback is returned instead of an error.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the assistant client
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Base URL of the assistant API; `None` disables the upstream call
    pub base_url: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

/// Client for the assistant collaborator
pub struct AssistantClient {
    client: Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Whether an upstream assistant is configured
    pub fn is_enabled(&self) -> bool {
        self.config.base_url.is_some()
    }

    /// Answer a chat message. Never fails: upstream errors degrade to
    /// the static guidance reply.
    pub async fn ask(&self, message: &str) -> String {
        match self.ask_upstream(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(error = %e, "Assistant unavailable, using fallback reply");
                fallback_reply().to_string()
            }
        }
    }

    async fn ask_upstream(&self, message: &str) -> Result<String, AssistantError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or(AssistantError::NotConfigured)?;
        let url = format!("{}/v1/chat", base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::Timeout
                } else if e.is_connect() {
                    AssistantError::Unavailable
                } else {
                    AssistantError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(AssistantError::Status(response.status().as_u16()));
        }

        let reply: ChatReply = response.json().await.map_err(AssistantError::Request)?;
        Ok(reply.reply)
    }
}

/// Canned guidance used whenever the upstream cannot answer
pub fn fallback_reply() -> &'static str {
    "Air quality is a crucial aspect of public health and environmental \
     well-being. Poor air quality can lead to respiratory and cardiovascular \
     diseases, harm ecosystems, and contribute to climate change. You can \
     help by using public transport, supporting clean energy initiatives, \
     and reducing waste. Every action counts."
}

/// Errors from the assistant upstream
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Assistant not configured")]
    NotConfigured,

    #[error("Assistant request timed out")]
    Timeout,

    #[error("Assistant unavailable")]
    Unavailable,

    #[error("Assistant returned status {0}")]
    Status(u16),

    #[error("Assistant request failed: {0}")]
    Request(#[from] reqwest::Error),
}
