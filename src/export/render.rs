//! Render backend contract.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::layout::CropPlan;
use crate::error::Result;
use crate::overlay::{BrandingLayer, SubtitleTrack};

/// Progress callback: overall 0–100 value plus a human-readable message.
///
/// Backends report non-decreasing values; the controller tolerates
/// regressions by ignoring them.
pub type ProgressSink = Arc<dyn Fn(f64, &str) + Send + Sync>;

/// Container format of the rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Mov,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Mov => "video/quicktime",
        }
    }
}

/// Basic facts about a source video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// Everything a backend needs for one render.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: PathBuf,
    pub source_info: VideoInfo,
    /// Full track; the backend burns in every segment.
    pub subtitles: SubtitleTrack,
    /// Full layer; only visible elements are composited.
    pub branding: BrandingLayer,
    /// `None` keeps the native dimensions.
    pub crop: Option<CropPlan>,
}

impl RenderJob {
    /// Dimensions of the rendered frame.
    pub fn output_size(&self) -> (u32, u32) {
        self.crop.map_or(
            (self.source_info.width, self.source_info.height),
            |plan| (plan.out_width, plan.out_height),
        )
    }
}

/// The final encoded artifact.
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub bytes: Bytes,
    pub format: OutputFormat,
}

impl RenderedVideo {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// External render/codec backend.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Inspect the source video.
    async fn probe(&self, source: &std::path::Path) -> Result<VideoInfo>;

    /// Render `job`, reporting overall progress through `progress`.
    async fn render(&self, job: &RenderJob, progress: ProgressSink) -> Result<RenderedVideo>;
}
