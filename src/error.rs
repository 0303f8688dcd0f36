//! Error types shared by the audio, transcription and export pipelines.

use thiserror::Error;

/// Media pipeline errors
///
/// Every variant carries the underlying message verbatim so callers can
/// surface it without substituting a generic failure.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Input could not be parsed as audio/video.
    #[error("decode error: {0}")]
    Decode(String),

    /// Internal consistency failure while serializing audio.
    #[error("encode error: {0}")]
    Encode(String),

    /// The speech-to-text service rejected the upload as too large.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The service answered with an empty or whitespace-only transcript.
    #[error("no speech detected in audio")]
    NoSpeechDetected,

    /// Opaque render backend failure.
    #[error("render backend error: {0}")]
    RenderBackend(String),

    /// Speech-to-text failure other than a size rejection.
    #[error("transcription service error: {0}")]
    Service(String),

    /// Invalid subtitle or branding data.
    #[error("invalid overlay: {0}")]
    Overlay(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),
}

impl MediaError {
    /// Whether this error is the service's size rejection.
    #[must_use]
    pub fn is_payload_too_large(&self) -> bool {
        matches!(self, Self::PayloadTooLarge(_))
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
