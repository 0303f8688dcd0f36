use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

use castforge::export::{ExportSnapshot, OutputFormat};
use castforge::{
    BrandingLayer, Config, ExportController, ExportRequest, FfmpegRenderer, StageId, StageStatus,
    TargetDimension,
};

use super::format_bytes;
use super::subtitles::load_track;

pub struct ExportOptions {
    pub subtitles: Option<PathBuf>,
    pub branding: Option<PathBuf>,
    pub target: Option<TargetDimension>,
    pub format: Option<OutputFormat>,
    pub fast: bool,
}

pub async fn cmd_export(config: Config, video: &Path, output: &Path, options: ExportOptions) -> Result<()> {
    let mut ffmpeg = config.export;
    if options.fast {
        ffmpeg = ffmpeg.with_fast_preset();
    }
    if let Some(format) = options.format {
        ffmpeg = ffmpeg.with_format(format);
    }

    let renderer = FfmpegRenderer::new(ffmpeg);
    if !renderer.check_available().await {
        anyhow::bail!(
            "ffmpeg not found at '{}'; install it or set export.ffmpeg_path",
            renderer.config().ffmpeg_path
        );
    }

    eprintln!("🎬 Exporting: {}", video.display());
    eprintln!("   Output: {}", output.display());

    let mut request = ExportRequest::new(video);
    if let Some(ref path) = options.subtitles {
        let track = load_track(path, None).await?;
        eprintln!("   Subtitles: {} segment(s)", track.len());
        request = request.with_subtitles(track);
    }
    if let Some(ref path) = options.branding {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let branding: BrandingLayer = serde_json::from_str(&content)
            .with_context(|| format!("invalid branding JSON in {}", path.display()))?;
        eprintln!(
            "   Branding: {} element(s), {} visible",
            branding.len(),
            branding.visible().count()
        );
        request = request.with_branding(branding);
    }
    if let Some(target) = options.target {
        eprintln!(
            "   Target: {}x{}{}",
            target.width,
            target.height,
            target.label.as_deref().map(|l| format!(" ({l})")).unwrap_or_default()
        );
        request = request.with_target(target);
    }

    let last: Mutex<Option<(StageId, StageStatus)>> = Mutex::new(None);
    let controller = ExportController::new(Arc::new(renderer)).with_observer(Arc::new(
        move |snapshot: &ExportSnapshot| {
            let Some(stage) = snapshot.current() else {
                return;
            };
            let key = Some((stage.id, stage.status));
            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == key {
                return;
            }
            *last = key;
            match stage.status {
                StageStatus::Error => eprintln!(
                    "   ❌ {}: {}",
                    stage.name,
                    stage.message.as_deref().unwrap_or("failed")
                ),
                _ => eprintln!("   [{:>3.0}%] {}", snapshot.overall, stage.name),
            }
        },
    ));

    let start = std::time::Instant::now();
    let rendered = controller
        .export(&request)
        .await
        .with_context(|| format!("export of {} failed", video.display()))?;

    tokio::fs::write(output, &rendered.bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    eprintln!(
        "\n✅ Export complete in {:.1}s: {} ({})",
        start.elapsed().as_secs_f64(),
        format_bytes(rendered.len()),
        rendered.format.mime_type()
    );

    Ok(())
}
