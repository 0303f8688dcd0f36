//! Configuration loaded from `~/.config/castforge/config.toml`.
//!
//! ```toml
//! [transcription]
//! endpoint = "https://api.openai.com/v1/audio/transcriptions"
//! model = "whisper-1"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [compression]
//! limit_bytes = 26214400
//! target_bytes = 20971520
//!
//! [export]
//! preset = "fast"
//! crf = 26
//! output_format = "webm"
//! ```
//!
//! Every section and key is optional. The API key itself never lives in
//! the file; only the name of the environment variable holding it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compress::CompressionSettings;
use crate::error::{MediaError, Result};
use crate::export::FfmpegConfig;
use crate::transcribe::ServiceConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcription: ServiceConfig,
    pub compression: CompressionSettings,
    pub export: FfmpegConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one the default
    /// location is used, and a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Config`] if a file exists but cannot be read or
    /// parsed, or if the compression limits are inconsistent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !required && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| MediaError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml(&content)
            .map_err(|e| MediaError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| MediaError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let c = &self.compression;
        if c.target_bytes == 0 || c.target_bytes >= c.limit_bytes {
            return Err(MediaError::Config(format!(
                "compression.target_bytes ({}) must be between 1 and limit_bytes ({})",
                c.target_bytes, c.limit_bytes
            )));
        }
        if c.min_sample_rate == 0 || c.ultra_sample_rate == 0 {
            return Err(MediaError::Config("sample rates must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Return the path to the default config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("castforge")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::MIB;
    use crate::export::OutputFormat;

    #[test]
    fn empty_document_is_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.compression, CompressionSettings::default());
        assert_eq!(config.transcription.model, "whisper-1");
        assert_eq!(config.export.crf, 23);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
[transcription]
model = "large-v3"
language = "fi"

[export]
crf = 30
output_format = "webm"
"#,
        )
        .unwrap();
        assert_eq!(config.transcription.model, "large-v3");
        assert_eq!(config.transcription.language.as_deref(), Some("fi"));
        assert_eq!(config.transcription.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.export.crf, 30);
        assert_eq!(config.export.output_format, OutputFormat::Webm);
        assert_eq!(config.compression.limit_bytes, 25 * MIB);
    }

    #[test]
    fn target_must_stay_below_limit() {
        let err = Config::from_toml(
            r"
[compression]
limit_bytes = 1000
target_bytes = 1000
",
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(Config::from_toml("[compression\nlimit = ").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[compression]\nmin_sample_rate = 11025\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.compression.min_sample_rate, 11_025);
    }

    #[test]
    fn default_path_ends_with_crate_dir() {
        assert!(config_path().ends_with("castforge/config.toml"));
    }
}
