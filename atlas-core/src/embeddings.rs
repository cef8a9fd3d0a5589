//! Embeddings for retrieval-augmented answering.
//!
//! Provides an `EmbeddingBackend` trait with implementations for:
//! - **OpenAI** — `POST /embeddings` (1536-dim `text-embedding-3-small`)
//! - **OpenAI-optional** — same client with graceful degradation to
//!   `Ok(None)`, so items are stored without vectors when the API is down

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

/// Default OpenAI (text-embedding-3-small) embedding dimensions
pub const OPENAI_DIMENSIONS: usize = 1536;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// EmbeddingBackend trait
// ============================================================================

/// Abstraction over embedding providers.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single text. Returns `None` if embedding is unavailable
    /// (used in optional mode to signal graceful degradation).
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError>;

    /// Embed a search query. Defaults to calling `embed()`; backends that
    /// distinguish query and document inputs can override this.
    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        self.embed(text).await
    }

    /// Returns the embedding dimension (e.g., 1536).
    fn dimensions(&self) -> usize;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Embedding generation errors
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid response: expected {expected} dimensions, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    #[error("Missing embedding in response")]
    MissingEmbedding,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

// ============================================================================
// Config types
// ============================================================================

/// OpenAI embedding client configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl EmbeddingConfig {
    pub fn new(api_key: Option<String>, model: String, dimensions: usize) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            dimensions,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Configuration union for the backend factory.
pub enum BackendConfig {
    OpenAi(EmbeddingConfig),
    OpenAiOptional(EmbeddingConfig),
}

/// Create the appropriate backend from configuration.
pub fn create_backend(config: BackendConfig) -> Result<Box<dyn EmbeddingBackend>, EmbeddingError> {
    match config {
        BackendConfig::OpenAi(c) => Ok(Box::new(OpenAiEmbeddingClient::new(c)?)),
        BackendConfig::OpenAiOptional(c) => Ok(Box::new(OptionalEmbeddingClient::new(c)?)),
    }
}

// ============================================================================
// OpenAI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiEmbeddingClient
// ============================================================================

/// OpenAI embedding client — calls the OpenAI Embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingClient {
    client: Client,
    config: EmbeddingConfig,
    base_url: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Self::with_base_url(config, OPENAI_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: EmbeddingConfig,
        base_url: String,
    ) -> Result<Self, EmbeddingError> {
        if config.api_key.is_empty() {
            return Err(EmbeddingError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Generate an embedding for the given text (direct call, returns raw Vec)
    pub async fn embed_raw(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let result = Retry::spawn(retry_strategy, || self.embed_once(text)).await;

        match result {
            Ok(vec) => Ok(vec),
            Err(e) => {
                tracing::error!(
                    attempts = self.config.max_retries,
                    error = %e,
                    "All embedding retry attempts failed"
                );
                Err(EmbeddingError::RetryExhausted {
                    attempts: self.config.max_retries,
                })
            }
        }
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAiEmbeddingRequest {
            model: self.config.model.clone(),
            input: vec![text.to_string()],
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
            let message = serde_json::from_str::<OpenAiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "OpenAI API error");

            return Err(EmbeddingError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let api_response: OpenAiEmbeddingResponse = response.json().await?;

        let values = api_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::MissingEmbedding)?;

        if values.len() != self.config.dimensions {
            return Err(EmbeddingError::InvalidDimensions {
                expected: self.config.dimensions,
                actual: values.len(),
            });
        }

        Ok(values)
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        self.embed_raw(text).await.map(Some)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// OptionalEmbeddingClient
// ============================================================================

/// Wraps `OpenAiEmbeddingClient`. On any error, logs a warning and returns
/// `Ok(None)` so the item is stored without an embedding vector.
pub struct OptionalEmbeddingClient {
    inner: OpenAiEmbeddingClient,
}

impl OptionalEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Ok(Self {
            inner: OpenAiEmbeddingClient::new(config)?,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(config: EmbeddingConfig, base_url: String) -> Result<Self, EmbeddingError> {
        Ok(Self {
            inner: OpenAiEmbeddingClient::with_base_url(config, base_url)?,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for OptionalEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        match self.inner.embed_raw(text).await {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Embedding failed — storing item without vector (not retrievable until reindexed)"
                );
                Ok(None)
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.inner.config.dimensions
    }

    fn name(&self) -> &str {
        "openai-optional"
    }
}

// ============================================================================
// TESTS
// ============================================================================
