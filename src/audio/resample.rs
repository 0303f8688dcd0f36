//! Nearest-neighbour resampling with mono downmix.
//!
//! Destination sample `i` reads source sample `floor(i * src_rate / dst_rate)`
//! from the first channel only. No anti-aliasing filter is applied; the
//! output only needs to stay intelligible for speech recognition.

use tracing::debug;

use super::pcm::PcmBuffer;
use crate::error::{MediaError, Result};

/// Number of output frames produced when converting `frames` samples.
///
/// Rounds to the nearest frame so the output duration matches the input.
#[must_use]
pub fn output_frames(frames: usize, source_rate: u32, target_rate: u32) -> usize {
    let num = frames as u64 * u64::from(target_rate);
    let den = u64::from(source_rate);
    ((num + den / 2) / den) as usize
}

/// Resample the first channel of `buffer` to `target_rate`, producing a mono buffer.
pub fn resample_mono(buffer: &PcmBuffer, target_rate: u32) -> Result<PcmBuffer> {
    if target_rate == 0 {
        return Err(MediaError::Encode("target sample rate must be non-zero".to_string()));
    }
    let source = buffer
        .channel(0)
        .ok_or_else(|| MediaError::Encode("buffer has no channels".to_string()))?;
    let source_rate = u64::from(buffer.sample_rate());
    let len = output_frames(source.len(), buffer.sample_rate(), target_rate);

    let samples: Vec<f32> = (0..len as u64)
        .map(|i| {
            let src = (i * source_rate / u64::from(target_rate)) as usize;
            source.get(src).copied().unwrap_or(0.0)
        })
        .collect();

    debug!(
        from_rate = buffer.sample_rate(),
        to_rate = target_rate,
        in_frames = source.len(),
        out_frames = samples.len(),
        "resampled to mono"
    );

    PcmBuffer::mono(target_rate, samples)
}
