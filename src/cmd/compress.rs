use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;

use castforge::{CompressionLadder, Config};

use super::format_bytes;

pub async fn cmd_compress(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    ultra: bool,
    json: bool,
) -> Result<()> {
    let data = Bytes::from(
        tokio::fs::read(input)
            .await
            .with_context(|| format!("failed to read {}", input.display()))?,
    );
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    eprintln!("🎧 Compressing: {} ({})", input.display(), format_bytes(data.len() as u64));

    let ladder = CompressionLadder::new(config.compression);
    let start = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        if ultra {
            ladder.ultra_pass(&data, extension.as_deref())
        } else {
            ladder.compress(&data, extension.as_deref())
        }
    })
    .await
    .context("compression task panicked")?
    .with_context(|| format!("failed to compress {}", input.display()))?;

    let output = output.map_or_else(|| default_output(input), Path::to_path_buf);
    tokio::fs::write(&output, result.audio.bytes())
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    let within_limit = result.audio.len() <= config.compression.limit_bytes;

    if json {
        let report = serde_json::json!({
            "input": input.display().to_string(),
            "output": output.display().to_string(),
            "pass": result.pass,
            "original_bytes": result.original_size,
            "original_sample_rate": result.original_rate,
            "encoded_bytes": result.audio.len(),
            "sample_rate": result.audio.sample_rate(),
            "ratio": result.ratio(),
            "within_limit": within_limit,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pass:        {}", result.pass);
        println!(
            "Sample rate: {} Hz → {} Hz",
            result.original_rate,
            result.audio.sample_rate()
        );
        println!(
            "Size:        {} → {} ({:.1}%)",
            format_bytes(result.original_size),
            format_bytes(result.audio.len()),
            result.ratio() * 100.0
        );
        println!("Output:      {}", output.display());
    }

    if within_limit {
        eprintln!("✅ Done in {:.1}s", start.elapsed().as_secs_f64());
    } else {
        eprintln!(
            "⚠️  Still above the {} upload limit; try --ultra",
            format_bytes(config.compression.limit_bytes)
        );
    }

    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "audio".to_string(), |s| s.to_string_lossy().to_string());
    input.with_file_name(format!("{stem}.compressed.wav"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("/tmp/talk.m4a")),
            PathBuf::from("/tmp/talk.compressed.wav")
        );
    }
}
