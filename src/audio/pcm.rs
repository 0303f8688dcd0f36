//! In-memory decoded waveform.

use crate::error::{MediaError, Result};

/// Decoded PCM audio: a sample rate plus one sample array per channel.
///
/// Samples are `f32` in `[-1.0, 1.0]`. All channels always hold the same
/// number of frames; constructors reject inconsistent input instead of
/// truncating it.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Build a buffer from per-channel sample arrays.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(MediaError::Encode("sample rate must be non-zero".to_string()));
        }
        let Some(first) = channels.first() else {
            return Err(MediaError::Encode("buffer has no channels".to_string()));
        };
        let frames = first.len();
        if let Some((idx, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != frames) {
            return Err(MediaError::Encode(format!(
                "channel {idx} has {} samples, expected {frames}",
                ch.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Build a single-channel buffer.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, vec![samples])
    }

    /// Build a buffer from interleaved samples (`L R L R ...`).
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Result<Self> {
        if channel_count == 0 {
            return Err(MediaError::Encode("buffer has no channels".to_string()));
        }
        if samples.len() % channel_count != 0 {
            return Err(MediaError::Encode(format!(
                "{} interleaved samples do not divide into {channel_count} channels",
                samples.len()
            )));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples of one channel, if it exists.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}
