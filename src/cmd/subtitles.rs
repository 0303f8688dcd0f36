use std::path::Path;

use anyhow::{Context, Result};

use castforge::overlay::{generator_for, parse_srt, AssGenerator, SrtGenerator};
use castforge::{SubtitleFormat, SubtitleGenerator, SubtitleTrack, TargetDimension};

pub async fn cmd_subtitles(
    input: &Path,
    format: SubtitleFormat,
    output: Option<&Path>,
    duration: Option<f64>,
    speaker_labels: bool,
    resolution: Option<TargetDimension>,
) -> Result<()> {
    let track = load_track(input, duration).await?;

    let generator: Box<dyn SubtitleGenerator> = match (format, resolution) {
        (SubtitleFormat::Srt, _) if speaker_labels => {
            Box::new(SrtGenerator::new().with_speaker_labels())
        }
        (SubtitleFormat::Ass, Some(size)) => {
            Box::new(AssGenerator::new().with_resolution(size.width, size.height))
        }
        _ => generator_for(format),
    };

    match output {
        Some(path) => {
            castforge::overlay::write_subtitles(generator.as_ref(), &track, path)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "📝 {} segment(s) → {} ({})",
                track.len(),
                path.display(),
                format.extension()
            );
        }
        None => print!("{}", generator.generate(&track)?),
    }

    Ok(())
}

/// Load a subtitle track from `.srt`, `.json` or plain transcript text.
///
/// Plain text is split into timed segments across `duration` seconds.
pub async fn load_track(path: &Path, duration: Option<f64>) -> Result<SubtitleTrack> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let track = match extension.as_deref() {
        Some("srt") => parse_srt(&content)?,
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid subtitle JSON in {}", path.display()))?,
        _ => {
            let duration = duration.with_context(|| {
                format!("--duration is required to time plain transcript {}", path.display())
            })?;
            SubtitleTrack::from_transcript(&content, duration)?
        }
    };

    Ok(track)
}
