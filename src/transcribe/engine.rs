//! Speech-to-text service client.
//!
//! The service accepts one audio file plus a format hint and returns the
//! transcript text. A `413 Payload Too Large` answer is surfaced as
//! [`MediaError::PayloadTooLarge`] so the orchestrator can escalate.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MediaError, Result};

/// An audio file ready for upload.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Bytes,
    pub file_name: String,
    /// Format hint sent with the file (e.g. `audio/wav`).
    pub mime_type: String,
}

impl AudioUpload {
    #[must_use]
    pub fn new(bytes: Bytes, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess a MIME type from a file extension.
#[must_use]
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "wav" | "wave" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" | "aac" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// External speech-to-text service.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one file. Returns the raw transcript text.
    async fn transcribe(&self, upload: &AudioUpload) -> Result<String>;
}

/// Settings for [`HttpSpeechToText`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Full URL of the transcription endpoint.
    pub endpoint: String,
    /// Model identifier sent as the `model` form field.
    pub model: String,
    /// Optional language code (e.g. "en").
    pub language: Option<String>,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            language: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 600,
        }
    }
}

impl ServiceConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Multipart HTTP client for OpenAI-compatible transcription endpoints.
pub struct HttpSpeechToText {
    client: reqwest::Client,
    config: ServiceConfig,
    api_key: Option<String>,
}

impl HttpSpeechToText {
    /// Create a client; the API key is taken from the configured env var.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let api_key = config.api_key();
        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(config: ServiceConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MediaError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn transcribe(&self, upload: &AudioUpload) -> Result<String> {
        // Shares the upload's buffer; the length keeps Content-Length on the request.
        let body = reqwest::Body::from(upload.bytes.clone());
        let file_part = multipart::Part::stream_with_length(body, upload.bytes.len() as u64)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| MediaError::Service(format!("mime: {e}")))?;

        let mut form = multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "json")
            .part("file", file_part);
        if let Some(ref lang) = self.config.language {
            form = form.text("language", lang.clone());
        }

        debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            bytes = upload.len(),
            mime = %upload.mime_type,
            "uploading audio for transcription"
        );

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MediaError::Service(format!("request: {e}")))?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::PayloadTooLarge(format!(
                "{} byte upload rejected: {}",
                upload.len(),
                body.trim()
            )));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(MediaError::Service(format!("status {status}: {}", body.trim())));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Service(format!("body: {e}")))?;

        info!(chars = parsed.text.len(), "transcription response received");

        Ok(parsed.text)
    }
}
