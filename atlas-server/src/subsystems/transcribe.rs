//! Transcription subsystem — turns uploaded audio into note text.
//!
//! Audio arrives base64-encoded over HTTP, is written under the configured
//! upload directory with a UUID filename, sent to the speech recognition
//! API, and removed once a transcript comes back. Failed uploads stay on
//! disk for inspection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use atlas_core::config::SpeechSettings;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const SPEECH_BASE_URL: &str = "https://speech.googleapis.com";

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Speech API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("No speech recognized in audio")]
    NoSpeech,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Speech API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    language_code: String,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Debug, Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognizeAlternative {
    transcript: String,
}

// ============================================================================
// SpeechClient
// ============================================================================

/// Speech recognition client (`POST /v1/speech:recognize`, base64 audio).
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: Client,
    api_key: String,
    settings: SpeechSettings,
    base_url: String,
}

impl SpeechClient {
    pub fn new(settings: SpeechSettings) -> Result<Self, SpeechError> {
        let api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();
        Self::with_base_url(api_key, settings, SPEECH_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        api_key: String,
        settings: SpeechSettings,
        base_url: String,
    ) -> Result<Self, SpeechError> {
        if api_key.is_empty() {
            return Err(SpeechError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            settings,
            base_url,
        })
    }

    /// Recognize speech in raw audio bytes. Joins all result transcripts.
    pub async fn recognize(
        &self,
        audio: &[u8],
        language: Option<&str>,
    ) -> Result<String, SpeechError> {
        let url = format!(
            "{}/v1/speech:recognize?key={}",
            self.base_url, self.api_key
        );

        let request = RecognizeRequest {
            config: RecognitionConfig {
                language_code: language.unwrap_or(&self.settings.language).to_string(),
            },
            audio: RecognitionAudio {
                content: BASE64.encode(audio),
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), message = %message, "Speech API error");
            return Err(SpeechError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: RecognizeResponse = response.json().await?;

        let transcript = body
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if transcript.trim().is_empty() {
            return Err(SpeechError::NoSpeech);
        }

        Ok(transcript)
    }
}

// ============================================================================
// Upload handling
// ============================================================================

/// Write audio to the upload dir, transcribe it, and remove the file on
/// success. Returns the transcript.
pub async fn transcribe_upload(
    client: &SpeechClient,
    upload_dir: &str,
    audio: &[u8],
    original_filename: Option<&str>,
    language: Option<&str>,
) -> Result<String, SpeechError> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let path = upload_path(upload_dir, original_filename);
    tokio::fs::write(&path, audio).await?;
    tracing::debug!(path = %path.display(), bytes = audio.len(), "Stored audio upload");

    let transcript = client.recognize(audio, language).await?;

    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove transcribed upload");
    }

    Ok(transcript)
}

/// UUID filename under the upload dir, keeping the original extension.
fn upload_path(upload_dir: &str, original_filename: Option<&str>) -> PathBuf {
    let extension = original_filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .unwrap_or("wav");

    Path::new(upload_dir).join(format!("{}.{}", Uuid::new_v4(), extension))
}

// ============================================================================
// TESTS
// ============================================================================
