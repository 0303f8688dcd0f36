//! `castforge` CLI - compress, transcribe, caption and export short-form video

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use castforge::export::OutputFormat;
use castforge::{Config, SubtitleFormat, TargetDimension};

#[derive(Parser)]
#[command(name = "castforge")]
#[command(about = "Media pipeline for short-form video: audio compression, transcription, overlays, export")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/castforge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shrink an audio file to fit the transcription upload limit
    Compress {
        /// Input audio (wav, mp3, m4a, flac, ogg)
        input: PathBuf,

        /// Output WAV path (default: <input>.compressed.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip straight to the fixed-rate ultra pass
        #[arg(long)]
        ultra: bool,

        /// Print the compression report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transcribe one or more audio files, one after another
    Transcribe {
        /// Audio files to transcribe
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Language hint (e.g. "en")
        #[arg(short, long)]
        language: Option<String>,

        /// Model identifier sent to the service
        #[arg(short, long)]
        model: Option<String>,

        /// Write <stem>.txt transcripts into this directory instead of stdout
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Convert a transcript, SRT or JSON track into a subtitle file
    Subtitles {
        /// Input: .srt, .json (segment list) or plain transcript text
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "timeline")]
        format: SubtitleFormatArg,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Media duration in seconds; required for plain transcripts
        #[arg(short, long)]
        duration: Option<f64>,

        /// Prefix SRT lines with speaker labels
        #[arg(long)]
        speaker_labels: bool,

        /// Video resolution for ASS output, e.g. 1080x1920
        #[arg(long)]
        resolution: Option<TargetDimension>,
    },

    /// Burn subtitles and branding into a video and re-render it
    Export {
        /// Source video
        video: PathBuf,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,

        /// Subtitle track (.srt or .json)
        #[arg(short, long)]
        subtitles: Option<PathBuf>,

        /// Branding elements (.json)
        #[arg(short, long)]
        branding: Option<PathBuf>,

        /// Target size: WIDTHxHEIGHT, 9:16, 1:1 or 16:9
        #[arg(short, long)]
        target: Option<TargetDimension>,

        /// Container format (default: from config)
        #[arg(long, value_enum)]
        format: Option<OutputFormatArg>,

        /// Faster encode at lower quality
        #[arg(long)]
        fast: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SubtitleFormatArg {
    Timeline,
    Srt,
    Ass,
}

impl From<SubtitleFormatArg> for SubtitleFormat {
    fn from(arg: SubtitleFormatArg) -> Self {
        match arg {
            SubtitleFormatArg::Timeline => Self::Timeline,
            SubtitleFormatArg::Srt => Self::Srt,
            SubtitleFormatArg::Ass => Self::Ass,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatArg {
    Mp4,
    Webm,
    Mov,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Mp4 => Self::Mp4,
            OutputFormatArg::Webm => Self::Webm,
            OutputFormatArg::Mov => Self::Mov,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compress {
            input,
            output,
            ultra,
            json,
        } => cmd::compress::cmd_compress(&config, &input, output.as_deref(), ultra, json).await,
        Commands::Transcribe {
            files,
            language,
            model,
            output_dir,
        } => {
            cmd::transcribe::cmd_transcribe(config, &files, language, model, output_dir.as_deref())
                .await
        }
        Commands::Subtitles {
            input,
            format,
            output,
            duration,
            speaker_labels,
            resolution,
        } => {
            cmd::subtitles::cmd_subtitles(
                &input,
                format.into(),
                output.as_deref(),
                duration,
                speaker_labels,
                resolution,
            )
            .await
        }
        Commands::Export {
            video,
            output,
            subtitles,
            branding,
            target,
            format,
            fast,
        } => {
            let options = cmd::export::ExportOptions {
                subtitles,
                branding,
                target,
                format: format.map(Into::into),
                fast,
            };
            cmd::export::cmd_export(config, &video, &output, options).await
        }
    }
}
