//! Transcription orchestration.
//!
//! A small explicit state machine decides whether to upload the original file
//! or a compressed artifact, and escalates once to the ultra compression pass
//! when the service rejects an upload as too large:
//!
//! ```text
//! Idle → Preparing → Transcribing ─┬─→ Completed
//!                                  └─→ Escalating → Transcribing ─┬─→ Completed
//!                                                                 └─→ Failed
//! ```
//!
//! Escalation is only reachable from the initial attempt, so the service is
//! called at most twice per input.

pub mod engine;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::compress::{CompressedAudio, CompressionLadder, CompressionPass, CompressionSettings};
use crate::error::{MediaError, Result};

pub use engine::{mime_for_extension, AudioUpload, HttpSpeechToText, ServiceConfig, SpeechToText};

/// A raw media file supplied by the caller.
#[derive(Debug, Clone)]
pub struct SourceMedia {
    pub bytes: Bytes,
    pub file_name: String,
}

impl SourceMedia {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "audio".to_string(), |n| n.to_string_lossy().to_string());
        Ok(Self::new(bytes, file_name))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name).extension().and_then(|e| e.to_str())
    }

    fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio")
    }

    fn as_upload(&self) -> AudioUpload {
        AudioUpload::new(
            self.bytes.clone(),
            self.file_name.clone(),
            self.extension().map_or("application/octet-stream", mime_for_extension),
        )
    }
}

/// Observable orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionState {
    Idle,
    Preparing,
    Transcribing,
    Escalating,
    Completed,
    Failed,
}

/// What was uploaded on the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Original,
    Compressed(CompressionPass),
}

/// Result of a successful transcription.
#[derive(Debug, Clone)]
pub struct TranscriptionOutcome {
    /// Transcript text, trimmed.
    pub text: String,
    /// Service calls made (1 or 2).
    pub attempts: u8,
    pub upload: UploadKind,
    pub uploaded_bytes: u64,
}

/// Callback invoked on every state transition.
pub type StateObserver = Arc<dyn Fn(TranscriptionState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Escalated,
}

impl Attempt {
    fn number(self) -> u8 {
        match self {
            Self::Initial => 1,
            Self::Escalated => 2,
        }
    }
}

enum Step {
    Preparing,
    Transcribing {
        attempt: Attempt,
        upload: AudioUpload,
        kind: UploadKind,
    },
    Escalating,
    Completed(TranscriptionOutcome),
    Failed(MediaError),
}

impl Step {
    fn state(&self) -> TranscriptionState {
        match self {
            Self::Preparing => TranscriptionState::Preparing,
            Self::Transcribing { .. } => TranscriptionState::Transcribing,
            Self::Escalating => TranscriptionState::Escalating,
            Self::Completed(_) => TranscriptionState::Completed,
            Self::Failed(_) => TranscriptionState::Failed,
        }
    }
}

/// Audio-to-text orchestrator.
pub struct Transcriber {
    service: Arc<dyn SpeechToText>,
    ladder: CompressionLadder,
    observer: Option<StateObserver>,
}

impl Transcriber {
    #[must_use]
    pub fn new(service: Arc<dyn SpeechToText>, settings: CompressionSettings) -> Self {
        Self {
            service,
            ladder: CompressionLadder::new(settings),
            observer: None,
        }
    }

    /// Register a state transition observer.
    #[must_use]
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Transcribe `source` without external cancellation.
    pub async fn transcribe(&self, source: &SourceMedia) -> Result<TranscriptionOutcome> {
        self.transcribe_with_cancel(source, &CancellationToken::new())
            .await
    }

    /// Transcribe `source`, aborting at the next suspension point once `cancel` fires.
    pub async fn transcribe_with_cancel(
        &self,
        source: &SourceMedia,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionOutcome> {
        self.notify(TranscriptionState::Idle);

        let mut step = Step::Preparing;
        self.notify(step.state());

        loop {
            step = match step {
                Step::Preparing => match self.prepare(source, cancel).await {
                    Ok((upload, kind)) => Step::Transcribing {
                        attempt: Attempt::Initial,
                        upload,
                        kind,
                    },
                    Err(e) => Step::Failed(e),
                },
                Step::Transcribing {
                    attempt,
                    upload,
                    kind,
                } => {
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(MediaError::Cancelled),
                        r = self.service.transcribe(&upload) => r,
                    };
                    match result {
                        Ok(text) if text.trim().is_empty() => Step::Failed(MediaError::NoSpeechDetected),
                        Ok(text) => Step::Completed(TranscriptionOutcome {
                            text: text.trim().to_string(),
                            attempts: attempt.number(),
                            upload: kind,
                            uploaded_bytes: upload.len(),
                        }),
                        Err(e) if e.is_payload_too_large() && attempt == Attempt::Initial => {
                            warn!(bytes = upload.len(), error = %e, "upload rejected as too large");
                            Step::Escalating
                        }
                        Err(e) => Step::Failed(e),
                    }
                }
                Step::Escalating => match self.compress(source, cancel, true).await {
                    Ok(compressed) => Step::Transcribing {
                        attempt: Attempt::Escalated,
                        kind: UploadKind::Compressed(compressed.pass),
                        upload: compressed_upload(source, compressed),
                    },
                    Err(e) => Step::Failed(e),
                },
                Step::Completed(outcome) => {
                    info!(
                        attempts = outcome.attempts,
                        chars = outcome.text.len(),
                        "transcription completed"
                    );
                    return Ok(outcome);
                }
                Step::Failed(e) => {
                    warn!(error = %e, "transcription failed");
                    return Err(e);
                }
            };
            self.notify(step.state());
        }
    }

    async fn prepare(
        &self,
        source: &SourceMedia,
        cancel: &CancellationToken,
    ) -> Result<(AudioUpload, UploadKind)> {
        let limit = self.ladder.settings().limit_bytes;
        if source.len() <= limit {
            info!(bytes = source.len(), "within service limit, uploading original");
            return Ok((source.as_upload(), UploadKind::Original));
        }

        info!(bytes = source.len(), limit, "over service limit, compressing");
        let compressed = self.compress(source, cancel, false).await?;
        let kind = UploadKind::Compressed(compressed.pass);
        Ok((compressed_upload(source, compressed), kind))
    }

    /// Run the ladder off the async thread.
    async fn compress(
        &self,
        source: &SourceMedia,
        cancel: &CancellationToken,
        ultra: bool,
    ) -> Result<CompressedAudio> {
        let ladder = self.ladder.clone();
        let bytes = source.bytes.clone();
        let ext = source.extension().map(str::to_owned);

        let task = tokio::task::spawn_blocking(move || {
            if ultra {
                ladder.ultra_pass(&bytes, ext.as_deref())
            } else {
                ladder.compress(&bytes, ext.as_deref())
            }
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(MediaError::Cancelled),
            joined = task => joined.map_err(|e| MediaError::Encode(format!("compression task failed: {e}")))?,
        }
    }

    fn notify(&self, state: TranscriptionState) {
        tracing::debug!(?state, "transcription state");
        if let Some(ref observer) = self.observer {
            observer(state);
        }
    }
}

fn compressed_upload(source: &SourceMedia, compressed: CompressedAudio) -> AudioUpload {
    let mime = compressed.audio.mime_type();
    AudioUpload::new(
        compressed.audio.into_bytes(),
        format!("{}.wav", source.stem()),
        mime,
    )
}
