//! Chat-completion client used to generate answers from retrieved context.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Abstraction over completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing completion in response")]
    MissingCompletion,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

/// Chat-completion client configuration
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl CompletionConfig {
    pub fn new(api_key: Option<String>, model: String, temperature: f32, max_tokens: u32) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            temperature,
            max_tokens,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

// ============================================================================
// OpenAI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiChatClient
// ============================================================================

/// OpenAI chat-completion client (`POST /chat/completions`).
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    config: CompletionConfig,
    base_url: String,
}

impl OpenAiChatClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        Self::with_base_url(config, OPENAI_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: CompletionConfig,
        base_url: String,
    ) -> Result<Self, CompletionError> {
        if config.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    async fn complete_once(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(CompletionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CompletionError::MissingCompletion)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        Retry::spawn(retry_strategy, || self.complete_once(prompt))
            .await
            .map_err(|e| {
                tracing::error!(
                    attempts = self.config.max_retries,
                    error = %e,
                    "All completion retry attempts failed"
                );
                CompletionError::RetryExhausted {
                    attempts: self.config.max_retries,
                }
            })
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}

// ============================================================================
// TESTS
// ============================================================================
