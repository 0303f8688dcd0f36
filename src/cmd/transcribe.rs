use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use castforge::transcribe::UploadKind;
use castforge::{Config, HttpSpeechToText, SourceMedia, Transcriber, TranscriptionState};

use super::format_bytes;

pub async fn cmd_transcribe(
    config: Config,
    files: &[PathBuf],
    language: Option<String>,
    model: Option<String>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let mut service_config = config.transcription;
    if language.is_some() {
        service_config.language = language;
    }
    if let Some(model) = model {
        service_config.model = model;
    }
    if service_config.api_key().is_none() {
        eprintln!(
            "⚠️  {} is not set; sending requests without authorization",
            service_config.api_key_env
        );
    }

    let service = Arc::new(HttpSpeechToText::new(service_config)?);
    let transcriber = Transcriber::new(service, config.compression).with_observer(Arc::new(
        |state: TranscriptionState| {
            if state == TranscriptionState::Escalating {
                eprintln!("   Upload rejected as too large, retrying with ultra compression");
            }
        },
    ));

    if let Some(dir) = output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let total = files.len();
    let mut failed = 0usize;

    // One at a time: each file may need a full decode and re-encode.
    for (index, path) in files.iter().enumerate() {
        eprintln!("🎙️  [{}/{total}] {}", index + 1, path.display());

        let source = SourceMedia::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let start = std::time::Instant::now();

        let outcome = match transcriber.transcribe(&source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("   ❌ {e}");
                failed += 1;
                continue;
            }
        };

        let upload = match outcome.upload {
            UploadKind::Original => "original".to_string(),
            UploadKind::Compressed(pass) => format!("{pass} compression"),
        };
        eprintln!(
            "   ✅ {:.1}s, {} uploaded ({upload}), {} attempt(s)",
            start.elapsed().as_secs_f64(),
            format_bytes(outcome.uploaded_bytes),
            outcome.attempts
        );

        match output_dir {
            Some(dir) => {
                let stem = path
                    .file_stem()
                    .map_or_else(|| "transcript".to_string(), |s| s.to_string_lossy().to_string());
                let target = dir.join(format!("{stem}.txt"));
                tokio::fs::write(&target, format!("{}\n", outcome.text))
                    .await
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("   Saved: {}", target.display());
            }
            None => {
                if total > 1 {
                    println!("== {} ==", path.display());
                }
                println!("{}", outcome.text);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} file(s) failed to transcribe");
    }
    Ok(())
}
