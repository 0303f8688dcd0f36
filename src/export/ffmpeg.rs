//! ffmpeg-based render backend.
//!
//! Probes the source with `ffprobe`, burns subtitles through an ASS file,
//! composites branding with `drawtext`/`overlay` and reports progress from
//! `-progress pipe:1`. Intermediate files live in a per-render work
//! directory that is removed when the render finishes or is dropped.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::render::{OutputFormat, ProgressSink, RenderBackend, RenderJob, RenderedVideo, VideoInfo};
use crate::error::{MediaError, Result};
use crate::overlay::{write_subtitles, AssGenerator, BrandingContent, BrandingElement, PixelRect};

/// Render progress occupies this span of the overall 0–100 scale.
const RENDER_START: f64 = 40.0;
const RENDER_END: f64 = 90.0;

/// ffmpeg stderr lines kept for error messages.
const STDERR_TAIL: usize = 8;

fn resolve_binary(name: &str) -> String {
    which::which(name).map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
}

/// Configuration for [`FfmpegRenderer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// Encoder preset; empty to omit
    pub preset: String,
    pub crf: u8,
    pub output_format: OutputFormat,
    /// Parent of the per-render work directory (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
    /// Font for text branding (fontconfig default if unset)
    pub font_file: Option<PathBuf>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: resolve_binary("ffmpeg"),
            ffprobe_path: resolve_binary("ffprobe"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            output_format: OutputFormat::Mp4,
            temp_dir: None,
            font_file: None,
        }
    }
}

impl FfmpegConfig {
    /// Quick drafts: faster preset, lower quality. Paths and container are kept.
    #[must_use]
    pub fn with_fast_preset(mut self) -> Self {
        self.preset = "veryfast".to_string();
        self.crf = 28;
        self
    }

    /// Switch container, picking matching codecs.
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        match format {
            OutputFormat::Webm => {
                self.video_codec = "libvpx-vp9".to_string();
                self.audio_codec = "libopus".to_string();
                self.preset = String::new();
            }
            OutputFormat::Mp4 | OutputFormat::Mov => {
                self.video_codec = "libx264".to_string();
                self.audio_codec = "aac".to_string();
            }
        }
        self
    }
}

/// A filter graph plus the extra image inputs it references.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub filter: String,
    /// Image inputs, ffmpeg input indices `1..`
    pub images: Vec<PathBuf>,
    /// Label of the final video stream
    pub output_label: String,
}

/// Escape a path for use inside a quoted filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace('%', "\\%")
        .replace('\n', "\\n")
}

/// Validate an `RRGGBB` or `#RRGGBB` color and return the bare hex digits.
fn hex(color: &str) -> Result<&str> {
    let digits = color.strip_prefix('#').unwrap_or(color);
    if digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(digits)
    } else {
        Err(MediaError::Overlay(format!("invalid color '{color}', expected RRGGBB")))
    }
}

fn drawtext_filter(
    element: &BrandingElement,
    text: &str,
    rect: PixelRect,
    font_file: Option<&Path>,
) -> Result<String> {
    let style = element.style.clone().unwrap_or_default();
    let alpha = element.opacity();

    let mut params = vec![format!("text='{}'", escape_drawtext(text))];
    if let Some(font) = font_file {
        params.push(format!("fontfile='{}'", escape_filter_path(font)));
    }
    params.push(format!("fontsize={}", style.font_size));
    params.push(format!("fontcolor=0x{}@{alpha:.3}", hex(&style.color)?));
    params.push(format!("x={}", rect.x));
    params.push(format!("y={}", rect.y));

    if let Some(ref bg) = style.background {
        params.push("box=1".to_string());
        params.push(format!("boxcolor=0x{}@{alpha:.3}", hex(bg)?));
        params.push("boxborderw=8".to_string());
    }
    if style.border_width > 0 {
        params.push(format!("borderw={}", style.border_width));
        params.push(format!(
            "bordercolor=0x{}",
            hex(style.border_color.as_deref().unwrap_or("000000"))?
        ));
    }

    Ok(format!("drawtext={}", params.join(":")))
}

fn image_filter(element: &BrandingElement, rect: PixelRect) -> String {
    let mut filter = format!(
        "scale={}:{},format=rgba,colorchannelmixer=aa={:.3}",
        rect.width,
        rect.height,
        element.opacity()
    );
    if element.rotation.abs() > f64::EPSILON {
        let rad = element.rotation.to_radians();
        filter.push_str(&format!(",rotate={rad:.6}:c=none:ow=rotw({rad:.6}):oh=roth({rad:.6})"));
    }
    filter
}

fn next_label(step: &mut usize) -> String {
    *step += 1;
    format!("v{step}")
}

/// Build the `-filter_complex` graph for `job`.
///
/// Order: crop/scale, then visible branding in list order (later elements
/// draw on top), then burned-in subtitles. Text rotation is not supported by
/// `drawtext` and is ignored.
///
/// # Errors
///
/// Returns [`MediaError::Overlay`] if a text style carries a color that is
/// not `RRGGBB` or `#RRGGBB`.
pub fn build_filter_graph(
    job: &RenderJob,
    ass_path: Option<&Path>,
    font_file: Option<&Path>,
) -> Result<FilterGraph> {
    let (width, height) = job.output_size();
    let mut chains = Vec::new();
    let mut images = Vec::new();

    let base = match job.crop {
        Some(plan) => format!("{},setsar=1", plan.to_filter()),
        None => "null".to_string(),
    };
    chains.push(format!("[0:v]{base}[v0]"));

    let mut step = 0;
    let mut current = "v0".to_string();

    for element in job.branding.visible() {
        let rect = element.pixel_rect(width, height);
        match element.content {
            BrandingContent::Text(ref text) => {
                if element.rotation.abs() > f64::EPSILON {
                    debug!(id = %element.id, "ignoring rotation on text element");
                }
                let next = next_label(&mut step);
                chains.push(format!(
                    "[{current}]{}[{next}]",
                    drawtext_filter(element, text, rect, font_file)?
                ));
                current = next;
            }
            BrandingContent::Image(ref path) => {
                images.push(path.clone());
                let input = images.len();
                let logo = format!("img{input}");
                chains.push(format!("[{input}:v]{}[{logo}]", image_filter(element, rect)));
                let next = next_label(&mut step);
                chains.push(format!("[{current}][{logo}]overlay={}:{}[{next}]", rect.x, rect.y));
                current = next;
            }
        }
    }

    if let Some(ass) = ass_path {
        let next = next_label(&mut step);
        chains.push(format!("[{current}]ass='{}'[{next}]", escape_filter_path(ass)));
        current = next;
    }

    Ok(FilterGraph {
        filter: chains.join(";"),
        images,
        output_label: current,
    })
}

/// Parse an `out_time=HH:MM:SS.micro` line from `-progress` output.
fn parse_out_time(line: &str) -> Option<f64> {
    let time = line.trim().strip_prefix("out_time=")?;

    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Map encoded seconds onto the render span of overall progress.
fn render_percent(encoded_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return RENDER_START;
    }
    let fraction = (encoded_secs / duration_secs).clamp(0.0, 1.0);
    RENDER_START + (RENDER_END - RENDER_START) * fraction
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe(json: &[u8]) -> Result<VideoInfo> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| MediaError::Decode(format!("ffprobe output: {e}")))?;

    let (width, height) = probe
        .streams
        .iter()
        .find_map(|s| Some((s.width?, s.height?)))
        .ok_or_else(|| MediaError::Decode("no video stream found".to_string()))?;

    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width,
        height,
        duration_secs,
    })
}

/// Per-render scratch directory, removed on drop.
struct WorkDir(PathBuf);

impl WorkDir {
    async fn create(base: Option<&Path>) -> Result<Self> {
        let dir = base
            .map_or_else(std::env::temp_dir, Path::to_path_buf)
            .join(format!("castforge-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            debug!(path = %self.0.display(), error = %e, "failed to remove work dir");
        }
    }
}

/// Renders exports with the ffmpeg CLI.
pub struct FfmpegRenderer {
    config: FfmpegConfig,
}

impl Default for FfmpegRenderer {
    fn default() -> Self {
        Self::new(FfmpegConfig::default())
    }
}

impl FfmpegRenderer {
    #[must_use]
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    /// Check if ffmpeg is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Build ffmpeg arguments
    fn build_args(&self, job: &RenderJob, graph: &FilterGraph, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostats", "-y"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();

        args.push("-i".to_string());
        args.push(job.source.to_string_lossy().to_string());
        for image in &graph.images {
            args.push("-i".to_string());
            args.push(image.to_string_lossy().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(graph.filter.clone());
        args.push("-map".to_string());
        args.push(format!("[{}]", graph.output_label));
        args.push("-map".to_string());
        args.push("0:a?".to_string());

        args.push("-c:v".to_string());
        args.push(self.config.video_codec.clone());
        if !self.config.preset.is_empty() {
            args.push("-preset".to_string());
            args.push(self.config.preset.clone());
        }
        args.push("-crf".to_string());
        args.push(self.config.crf.to_string());
        args.push("-c:a".to_string());
        args.push(self.config.audio_codec.clone());

        if matches!(self.config.output_format, OutputFormat::Mp4 | OutputFormat::Mov) {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }

        args.push("-progress".to_string());
        args.push("pipe:1".to_string());
        args.push(output.to_string_lossy().to_string());

        args
    }

    async fn run_ffmpeg(&self, args: &[String], duration_secs: f64, progress: &ProgressSink) -> Result<()> {
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::RenderBackend(format!("failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::RenderBackend("failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::RenderBackend("failed to capture ffmpeg stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL);
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("ffmpeg: {}", line);
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut reported = RENDER_START;
        while let Some(line) = lines.next_line().await? {
            if let Some(secs) = parse_out_time(&line) {
                let pct = render_percent(secs, duration_secs);
                if pct > reported {
                    reported = pct;
                    progress(pct, "Rendering");
                }
            }
        }

        let status = child.wait().await?;
        let tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let detail = tail.trim();
            return Err(MediaError::RenderBackend(if detail.is_empty() {
                format!("ffmpeg exited with {status}")
            } else {
                format!("ffmpeg exited with {status}: {detail}")
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl RenderBackend for FfmpegRenderer {
    async fn probe(&self, source: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height:format=duration",
                "-of",
                "json",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::RenderBackend(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Decode(format!(
                "ffprobe could not read {}: {}",
                source.display(),
                stderr.trim()
            )));
        }

        let info = parse_probe(&output.stdout)?;
        debug!(width = info.width, height = info.height, duration = info.duration_secs, "probed source");
        Ok(info)
    }

    async fn render(&self, job: &RenderJob, progress: ProgressSink) -> Result<RenderedVideo> {
        progress(0.0, "Preparing source");
        let work = WorkDir::create(self.config.temp_dir.as_deref()).await?;
        let (width, height) = job.output_size();

        progress(20.0, "Writing subtitles");
        let ass_path = if job.subtitles.is_empty() {
            None
        } else {
            let path = work.path().join("subtitles.ass");
            let generator = AssGenerator::new().with_resolution(width, height);
            write_subtitles(&generator, &job.subtitles, &path).await?;
            Some(path)
        };

        progress(30.0, "Compositing branding");
        let graph = build_filter_graph(job, ass_path.as_deref(), self.config.font_file.as_deref())?;
        let output_path = work
            .path()
            .join(format!("output.{}", self.config.output_format.extension()));
        let args = self.build_args(job, &graph, &output_path);
        debug!("ffmpeg args: {:?}", args);

        progress(RENDER_START, "Rendering");
        self.run_ffmpeg(&args, job.source_info.duration_secs, &progress)
            .await?;

        progress(RENDER_END, "Finalizing");
        let bytes = tokio::fs::read(&output_path).await?;
        info!(bytes = bytes.len(), width, height, "render complete");
        progress(100.0, "Export complete");

        Ok(RenderedVideo {
            bytes: Bytes::from(bytes),
            format: self.config.output_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::layout::{plan_crop, TargetDimension};
    use crate::overlay::{BrandingLayer, SubtitleTrack, TextStyle};

    fn job(branding: BrandingLayer, crop: bool) -> RenderJob {
        let info = VideoInfo {
            width: 1920,
            height: 1080,
            duration_secs: 60.0,
        };
        RenderJob {
            source: PathBuf::from("/videos/in.mp4"),
            source_info: info,
            subtitles: SubtitleTrack::new(),
            branding,
            crop: crop.then(|| plan_crop(1920, 1080, &TargetDimension::vertical()).unwrap()),
        }
    }

    #[test]
    fn plain_graph_is_passthrough() {
        let graph = build_filter_graph(&job(BrandingLayer::new(), false), None, None).unwrap();
        assert_eq!(graph.filter, "[0:v]null[v0]");
        assert_eq!(graph.output_label, "v0");
        assert!(graph.images.is_empty());
    }

    #[test]
    fn graph_composes_crop_branding_then_subtitles() {
        let mut branding = BrandingLayer::new();
        branding.add(
            BrandingElement::logo("/assets/logo.png")
                .with_position(10.0, 10.0)
                .with_size(100, 50)
                .with_opacity(0.5),
        );
        branding.add(BrandingElement::text("Episode 7").with_position(50.0, 90.0));
        branding.add(BrandingElement::watermark("hidden").hidden());

        let graph = build_filter_graph(
            &job(branding, true),
            Some(Path::new("/tmp/work/subtitles.ass")),
            None,
        )
        .unwrap();

        let chains: Vec<&str> = graph.filter.split(';').collect();
        assert_eq!(chains[0], "[0:v]crop=606:1080:657:0,scale=1080:1920,setsar=1[v0]");
        assert_eq!(
            chains[1],
            "[1:v]scale=100:50,format=rgba,colorchannelmixer=aa=0.500[img1]"
        );
        assert_eq!(chains[2], "[v0][img1]overlay=108:192[v1]");
        assert!(chains[3].starts_with("[v1]drawtext=text='Episode 7'"));
        assert!(chains[3].contains("x=540:y=1728"));
        assert_eq!(chains[4], "[v2]ass='/tmp/work/subtitles.ass'[v3]");
        assert_eq!(chains.len(), 5);
        assert_eq!(graph.output_label, "v3");
        assert_eq!(graph.images, vec![PathBuf::from("/assets/logo.png")]);
    }

    #[test]
    fn drawtext_styles_and_escaping() {
        let el = BrandingElement::text("it's 100%: live")
            .with_style(TextStyle {
                font_size: 40,
                color: "#FF0000".to_string(),
                background: Some("000000".to_string()),
                border_color: None,
                border_width: 2,
            })
            .with_opacity(0.8);
        let filter = drawtext_filter(&el, "it's 100%: live", el.pixel_rect(100, 100), None).unwrap();

        assert!(filter.starts_with("drawtext=text='it\\'s 100\\%\\: live'"));
        assert!(filter.contains("fontsize=40"));
        assert!(filter.contains("fontcolor=0xFF0000@0.800"));
        assert!(filter.contains("box=1:boxcolor=0x000000@0.800"));
        assert!(filter.contains("borderw=2:bordercolor=0x000000"));
    }

    #[test]
    fn colors_must_be_six_hex_digits() {
        assert_eq!(hex("#a0B1c2").unwrap(), "a0B1c2");
        assert_eq!(hex("FFFFFF").unwrap(), "FFFFFF");
        for bad in ["white", "#FFF", "FFFFFF;[0:v]nullsink", "12345G", "", "#"] {
            assert!(matches!(hex(bad), Err(MediaError::Overlay(_))), "{bad}");
        }
    }

    #[test]
    fn injected_color_fails_the_whole_graph() {
        let style = |color: &str, background: Option<&str>, border: Option<&str>| TextStyle {
            color: color.to_string(),
            background: background.map(str::to_string),
            border_color: border.map(str::to_string),
            border_width: 1,
            ..TextStyle::default()
        };
        let cases = [
            style("FFFFFF;[0:v]nullsink", None, None),
            style("FFFFFF", Some("000000:box=0"), None),
            style("FFFFFF", None, Some("000000[x];[x]null")),
        ];
        for case in cases {
            let mut branding = BrandingLayer::new();
            branding.add(BrandingElement::text("hi").with_style(case));
            let err = build_filter_graph(&job(branding, false), None, None).unwrap_err();
            assert!(matches!(err, MediaError::Overlay(_)));
        }
    }

    #[test]
    fn rotated_logo_uses_rotate_filter() {
        let el = BrandingElement::logo("a.png").with_rotation(90.0);
        let filter = image_filter(&el, el.pixel_rect(100, 100));
        assert!(filter.contains(",rotate=1.570796:c=none"));
    }

    #[test]
    fn args_request_progress_and_map_graph_output() {
        let renderer = FfmpegRenderer::new(FfmpegConfig::default());
        let job = job(BrandingLayer::new(), false);
        let graph = build_filter_graph(&job, None, None).unwrap();
        let args = renderer.build_args(&job, &graph, Path::new("/tmp/out.mp4"));

        let joined = args.join(" ");
        assert!(joined.contains("-i /videos/in.mp4"));
        assert!(joined.contains("-map [v0] -map 0:a?"));
        assert!(joined.contains("-progress pipe:1"));
        assert!(joined.contains("-movflags +faststart"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn fast_preset_keeps_paths_and_container() {
        let base = FfmpegConfig {
            ffmpeg_path: "/opt/ffmpeg".to_string(),
            ..FfmpegConfig::default()
        }
        .with_format(OutputFormat::Mov);
        let fast = base.clone().with_fast_preset();
        assert_eq!(fast.preset, "veryfast");
        assert_eq!(fast.crf, 28);
        assert_eq!(fast.ffmpeg_path, "/opt/ffmpeg");
        assert_eq!(fast.output_format, OutputFormat::Mov);
    }

    #[test]
    fn webm_config_switches_codecs() {
        let config = FfmpegConfig::default().with_format(OutputFormat::Webm);
        assert_eq!(config.video_codec, "libvpx-vp9");
        assert!(config.preset.is_empty());
    }

    #[test]
    fn out_time_maps_into_render_span() {
        assert_eq!(parse_out_time("out_time=00:01:30.500000"), Some(90.5));
        assert_eq!(parse_out_time("out_time=N/A"), None);
        assert_eq!(parse_out_time("frame=12"), None);

        assert!((render_percent(0.0, 60.0) - 40.0).abs() < 1e-9);
        assert!((render_percent(30.0, 60.0) - 65.0).abs() < 1e-9);
        assert!((render_percent(120.0, 60.0) - 90.0).abs() < 1e-9);
        assert!((render_percent(5.0, 0.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn probe_json_parsing() {
        let json = br#"{"streams":[{"width":1280,"height":720}],"format":{"duration":"12.480000"}}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.duration_secs - 12.48).abs() < 1e-9);

        assert!(matches!(parse_probe(br#"{"streams":[]}"#), Err(MediaError::Decode(_))));
        assert!(matches!(parse_probe(b"not json"), Err(MediaError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_ffprobe_is_backend_error() {
        let renderer = FfmpegRenderer::new(FfmpegConfig {
            ffprobe_path: "/nonexistent/castforge-ffprobe".to_string(),
            ..FfmpegConfig::default()
        });
        let err = renderer.probe(Path::new("in.mp4")).await.unwrap_err();
        assert!(matches!(err, MediaError::RenderBackend(_)));
    }

    #[tokio::test]
    async fn work_dir_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let work = WorkDir::create(Some(base.path())).await.unwrap();
        let path = work.path().to_path_buf();
        assert!(path.exists());
        drop(work);
        assert!(!path.exists());
    }
}
