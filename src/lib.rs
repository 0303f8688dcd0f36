//! `castforge` - media pipeline for short-form video content
//!
//! # Features
//!
//! - **Audio compression**: decode, downmix to mono, nearest-neighbour
//!   resample and re-encode as 16-bit PCM WAV to fit a hard upload limit
//! - **Transcription**: orchestrated speech-to-text with a one-shot
//!   escalation to an ultra-compressed artifact on size rejection
//! - **Overlays**: time-addressed subtitles and positioned branding elements
//! - **Export**: crop-to-fill re-rendering through ffmpeg with stage-weighted
//!   progress tracking
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use castforge::{CompressionSettings, HttpSpeechToText, ServiceConfig, SourceMedia, Transcriber};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = Arc::new(HttpSpeechToText::new(ServiceConfig::default())?);
//!     let transcriber = Transcriber::new(service, CompressionSettings::default());
//!     let source = SourceMedia::from_path("interview.wav".as_ref()).await?;
//!     let outcome = transcriber.transcribe(&source).await?;
//!     println!("{}", outcome.text);
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod compress;
pub mod config;
pub mod error;
pub mod export;
pub mod overlay;
pub mod transcribe;

pub use audio::{decode_audio, encode_wav, resample_mono, EncodedAudio, PcmBuffer};
pub use compress::{
    compression_target, CompressedAudio, CompressionLadder, CompressionPass, CompressionSettings,
};
pub use config::Config;
pub use error::{MediaError, Result};
pub use export::{
    ExportController, ExportRequest, ExportSnapshot, FfmpegConfig, FfmpegRenderer, RenderBackend,
    Stage, StageId, StageStatus, TargetDimension,
};
pub use overlay::{
    BrandingElement, BrandingLayer, SubtitleFormat, SubtitleGenerator, SubtitleSegment,
    SubtitleTrack,
};
pub use transcribe::{
    HttpSpeechToText, ServiceConfig, SourceMedia, SpeechToText, Transcriber, TranscriptionOutcome,
    TranscriptionState,
};

/// Version of castforge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
