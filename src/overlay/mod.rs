//! Overlay composition model: subtitles and branding composited onto video.

pub mod branding;
pub mod format;
pub mod subtitle;

pub use branding::{
    BrandingContent, BrandingElement, BrandingKind, BrandingLayer, BrandingPatch, PixelRect,
    Position, Size, TextStyle,
};
pub use format::{
    generator_for, parse_srt, write_subtitles, AssGenerator, SrtGenerator, SubtitleFormat,
    SubtitleGenerator, SubtitleStyle, TimelineGenerator,
};
pub use subtitle::{SegmentPatch, SubtitleSegment, SubtitleTrack};
