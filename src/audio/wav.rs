//! Canonical uncompressed WAV container (RIFF / 16-bit little-endian PCM).
//!
//! ```text
//! Bytes 0-3:   "RIFF"
//! Bytes 4-7:   file size - 8
//! Bytes 8-11:  "WAVE"
//! Bytes 12-15: "fmt "
//! Bytes 16-19: 16 (fmt chunk size)
//! Bytes 20-21: 1 (PCM)
//! Bytes 22-23: channel count
//! Bytes 24-27: sample rate
//! Bytes 28-31: byte rate = sample_rate * channels * 2
//! Bytes 32-33: block align = channels * 2
//! Bytes 34-35: 16 (bits per sample)
//! Bytes 36-39: "data"
//! Bytes 40-43: data size = frames * channels * 2
//! ```
//!
//! `hound` writes the plain `fmt ` chunk for up to two 16-bit channels, so
//! mono and stereo output carry exactly this 44-byte header.

use std::io::Cursor;

use bytes::Bytes;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::pcm::PcmBuffer;
use crate::error::{MediaError, Result};

const BITS_PER_SAMPLE: u16 = 16;

/// An encoded, immutable WAV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    bytes: Bytes,
    sample_rate: u32,
    channels: u16,
    frames: usize,
}

impl EncodedAudio {
    /// Raw file bytes (header + payload).
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Consume into the raw file bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Total byte length including the header.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames in the payload.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// MIME type to declare when uploading.
    pub fn mime_type(&self) -> &'static str {
        "audio/wav"
    }
}

/// Scale a float sample to signed 16-bit.
///
/// Negative values scale by 32768, positive by 32767, after clamping to `[-1, 1]`.
#[must_use]
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32_768.0).round() as i16
    } else {
        (s * 32_767.0).round() as i16
    }
}

/// Inverse of [`sample_to_i16`].
#[must_use]
pub fn i16_to_sample(value: i16) -> f32 {
    if value < 0 {
        f32::from(value) / 32_768.0
    } else {
        f32::from(value) / 32_767.0
    }
}

/// Serialize every channel of `buffer` into a canonical WAV file.
pub fn encode_wav(buffer: &PcmBuffer) -> Result<EncodedAudio> {
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| MediaError::Encode(format!("{} channels exceed WAV limit", buffer.channel_count())))?;
    let frames = buffer.frames();

    let spec = WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut out = Vec::with_capacity(44 + frames * usize::from(channels) * 2);
    {
        let mut writer = WavWriter::new(Cursor::new(&mut out), spec)
            .map_err(|e| MediaError::Encode(format!("failed to create WAV writer: {e}")))?;

        for i in 0..frames {
            for ch in buffer.channels() {
                let sample = ch
                    .get(i)
                    .copied()
                    .ok_or_else(|| MediaError::Encode(format!("channel shorter than {frames} frames")))?;
                writer
                    .write_sample(sample_to_i16(sample))
                    .map_err(|e| MediaError::Encode(format!("failed to write sample: {e}")))?;
            }
        }

        writer
            .finalize()
            .map_err(|e| MediaError::Encode(format!("failed to finalize WAV: {e}")))?;
    }

    Ok(EncodedAudio {
        bytes: Bytes::from(out),
        sample_rate: buffer.sample_rate(),
        channels,
        frames,
    })
}

/// Stream parameters of a WAV file, or `None` if `data` is not one.
#[must_use]
pub fn read_spec(data: &[u8]) -> Option<WavSpec> {
    WavReader::new(Cursor::new(data)).ok().map(|r| r.spec())
}

/// Whether `spec` describes the 16-bit integer PCM this module reads exactly.
#[must_use]
pub fn is_pcm16(spec: &WavSpec) -> bool {
    spec.sample_format == SampleFormat::Int && spec.bits_per_sample == BITS_PER_SAMPLE
}

/// Decode a 16-bit PCM WAV file back into a [`PcmBuffer`].
pub fn decode_wav(data: &[u8]) -> Result<PcmBuffer> {
    let mut reader =
        WavReader::new(Cursor::new(data)).map_err(|e| MediaError::Decode(format!("invalid WAV: {e}")))?;
    let spec = reader.spec();

    if !is_pcm16(&spec) {
        return Err(MediaError::Decode(format!(
            "unsupported WAV encoding: {:?} at {} bits",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(MediaError::Decode("WAV declares zero channels or sample rate".to_string()));
    }

    let interleaved: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(i16_to_sample))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| MediaError::Decode(format!("WAV payload: {e}")))?;

    PcmBuffer::from_interleaved(spec.sample_rate, usize::from(spec.channels), &interleaved)
        .map_err(|e| MediaError::Decode(e.to_string()))
}
