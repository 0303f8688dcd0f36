//! Video export: stage tracking, crop planning and rendering.
//!
//! ```text
//! prepare (0–20) → subtitles (20–30) → branding (30–40) → render (40–90) → finalize (90–100)
//! ```

pub mod ffmpeg;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod stage;

pub use ffmpeg::{FfmpegConfig, FfmpegRenderer};
pub use layout::{crop_axis, plan_crop, CropAxis, CropPlan, TargetDimension};
pub use pipeline::{ExportController, ExportRequest, ExportSnapshot, SnapshotObserver};
pub use render::{OutputFormat, ProgressSink, RenderBackend, RenderJob, RenderedVideo, VideoInfo};
pub use stage::{stages_at, Stage, StageId, StageStatus};
