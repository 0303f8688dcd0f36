//! Fit-to-limit audio compression ladder.
//!
//! Three passes, each pure and independent of the others:
//!
//! 1. **Standard** - sample rate scaled by `1 / sqrt(source_size / target_size)`,
//!    floored at the minimum intelligible rate.
//! 2. **Heavy** - the same formula against half the target size; used when the
//!    standard artifact still exceeds the service limit.
//! 3. **Ultra** - a fixed 8 kHz mono pass, used after the service rejects an
//!    upload as too large.
//!
//! The square root is an empirically tuned heuristic, not a derived law.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audio::{self, EncodedAudio, PcmBuffer};
use crate::error::Result;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Tunables for the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Hard upload limit of the speech-to-text service.
    pub limit_bytes: u64,
    /// Size the standard pass aims for; strictly below `limit_bytes` to leave
    /// room for multipart overhead.
    pub target_bytes: u64,
    /// Lowest sample rate the computed passes may choose.
    pub min_sample_rate: u32,
    /// Fixed rate of the ultra pass.
    pub ultra_sample_rate: u32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            limit_bytes: 25 * MIB,
            target_bytes: 20 * MIB,
            min_sample_rate: 8_000,
            ultra_sample_rate: 8_000,
        }
    }
}

/// Which rung of the ladder produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPass {
    Standard,
    Heavy,
    Ultra,
}

impl CompressionPass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Heavy => "heavy",
            Self::Ultra => "ultra",
        }
    }
}

impl std::fmt::Display for CompressionPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired maximum size and the sample rate computed to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionTarget {
    pub max_bytes: u64,
    pub sample_rate: u32,
}

/// Compute the sample rate needed to shrink `source_size` bytes to `target_bytes`.
///
/// `rate = max(min_rate, floor(original_rate / sqrt(source_size / target_bytes)))`,
/// never above the original rate (the ladder only ever downsamples).
///
/// The ceiling wins over the floor: a source recorded below `min_rate`
/// keeps its native rate rather than being upsampled to the floor. The
/// ultra pass applies the same cap to its fixed rate.
#[must_use]
pub fn compression_target(
    source_size: u64,
    original_rate: u32,
    target_bytes: u64,
    min_rate: u32,
) -> CompressionTarget {
    let ratio = source_size as f64 / target_bytes.max(1) as f64;
    let computed = if ratio > 0.0 {
        (f64::from(original_rate) / ratio.sqrt()).floor() as u32
    } else {
        original_rate
    };
    CompressionTarget {
        max_bytes: target_bytes,
        sample_rate: computed.max(min_rate).min(original_rate),
    }
}

/// A compressed artifact and how it was produced.
#[derive(Debug, Clone)]
pub struct CompressedAudio {
    pub audio: EncodedAudio,
    pub pass: CompressionPass,
    pub original_size: u64,
    pub original_rate: u32,
}

impl CompressedAudio {
    /// Encoded size as a fraction of the original.
    pub fn ratio(&self) -> f64 {
        self.audio.len() as f64 / self.original_size.max(1) as f64
    }
}

/// Drives the standard → heavy → ultra passes.
#[derive(Debug, Clone, Default)]
pub struct CompressionLadder {
    settings: CompressionSettings,
}

impl CompressionLadder {
    #[must_use]
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    /// Steps 1 and 2: standard pass, escalating to the heavy pass if the
    /// result still exceeds the service limit.
    ///
    /// Decode failures propagate immediately and are not retried.
    pub fn compress(&self, source: &Bytes, extension: Option<&str>) -> Result<CompressedAudio> {
        let source_size = source.len() as u64;
        let buffer = audio::decode_audio(source, extension)?;

        let standard = self.standard_pass(&buffer, source_size)?;
        if standard.audio.len() <= self.settings.limit_bytes {
            return Ok(standard);
        }

        warn!(
            bytes = standard.audio.len(),
            limit = self.settings.limit_bytes,
            "standard pass still over limit, escalating to heavy pass"
        );
        let heavy = self.heavy_pass(&buffer, source_size)?;
        if heavy.audio.len() > self.settings.limit_bytes {
            warn!(
                bytes = heavy.audio.len(),
                limit = self.settings.limit_bytes,
                "heavy pass still over limit"
            );
        }
        Ok(heavy)
    }

    /// Step 1 against an already decoded buffer.
    pub fn standard_pass(&self, buffer: &PcmBuffer, source_size: u64) -> Result<CompressedAudio> {
        let target = compression_target(
            source_size,
            buffer.sample_rate(),
            self.settings.target_bytes,
            self.settings.min_sample_rate,
        );
        self.run(buffer, source_size, target, CompressionPass::Standard)
    }

    /// Step 2: the standard formula aimed at half the target size.
    pub fn heavy_pass(&self, buffer: &PcmBuffer, source_size: u64) -> Result<CompressedAudio> {
        let target = compression_target(
            source_size,
            buffer.sample_rate(),
            self.settings.target_bytes / 2,
            self.settings.min_sample_rate,
        );
        self.run(buffer, source_size, target, CompressionPass::Heavy)
    }

    /// Step 3: decode `source` afresh and decimate at the fixed ultra rate.
    pub fn ultra_pass(&self, source: &Bytes, extension: Option<&str>) -> Result<CompressedAudio> {
        let buffer = audio::decode_audio(source, extension)?;
        let target = CompressionTarget {
            max_bytes: self.settings.limit_bytes,
            sample_rate: self.settings.ultra_sample_rate.min(buffer.sample_rate()),
        };
        self.run(&buffer, source.len() as u64, target, CompressionPass::Ultra)
    }

    fn run(
        &self,
        buffer: &PcmBuffer,
        source_size: u64,
        target: CompressionTarget,
        pass: CompressionPass,
    ) -> Result<CompressedAudio> {
        let encoded = audio::resample_and_encode(buffer, target.sample_rate)?;

        info!(
            pass = pass.as_str(),
            from_rate = buffer.sample_rate(),
            to_rate = target.sample_rate,
            original_bytes = source_size,
            target_bytes = target.max_bytes,
            encoded_bytes = encoded.len(),
            "compression pass complete"
        );

        Ok(CompressedAudio {
            audio: encoded,
            pass,
            original_size: source_size,
            original_rate: buffer.sample_rate(),
        })
    }
}
