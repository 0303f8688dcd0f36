//! Decode arbitrary input audio into a [`PcmBuffer`].
//!
//! Canonical 16-bit PCM WAV takes an exact fast path through
//! [`wav::decode_wav`](super::wav::decode_wav); everything else goes through
//! symphonia (wav, mp3, aac/m4a, flac, ogg/vorbis).

use std::io::Cursor;

use bytes::Bytes;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::pcm::PcmBuffer;
use super::wav;
use crate::error::{MediaError, Result};

/// Decode `data`, using `extension` (e.g. `"mp3"`) as a format hint.
pub fn decode_audio(data: &Bytes, extension: Option<&str>) -> Result<PcmBuffer> {
    if data.is_empty() {
        return Err(MediaError::Decode("input is empty".to_string()));
    }

    if let Some(spec) = wav::read_spec(data).filter(wav::is_pcm16) {
        debug!(sample_rate = spec.sample_rate, channels = spec.channels, "decoding PCM16 WAV directly");
        return wav::decode_wav(data);
    }

    decode_with_symphonia(data, extension)
}

fn decode_with_symphonia(data: &Bytes, extension: Option<&str>) -> Result<PcmBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data.clone())), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MediaError::Decode(format!("probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MediaError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut sample_rate = codec_params.sample_rate;
    // Taken from the first decoded frame; the interleaved layout follows it.
    let mut channel_count: Option<usize> = None;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| MediaError::Decode(format!("codec init failed: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(MediaError::Decode(format!("packet read: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "skipping corrupt audio frame");
                continue;
            }
            Err(e) => return Err(MediaError::Decode(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        if decoded.frames() == 0 {
            continue;
        }
        sample_rate.get_or_insert(spec.rate);
        track_channels(&mut channel_count, spec.channels.count())?;

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let rate = sample_rate.ok_or_else(|| MediaError::Decode("unknown sample rate".to_string()))?;
    let channels = channel_count.unwrap_or(1);

    if interleaved.is_empty() {
        return Err(MediaError::Decode("no audio samples decoded".to_string()));
    }

    let buffer = PcmBuffer::from_interleaved(rate, channels, &interleaved)
        .map_err(|e| MediaError::Decode(e.to_string()))?;

    debug!(
        sample_rate = rate,
        channels,
        duration_secs = buffer.duration_secs(),
        "decoded audio"
    );

    Ok(buffer)
}

/// Pin the stream's channel count to the first decoded frame and reject
/// frames that disagree with it.
fn track_channels(pinned: &mut Option<usize>, frame_channels: usize) -> Result<usize> {
    let channels = *pinned.get_or_insert(frame_channels);
    if frame_channels != channels {
        return Err(MediaError::Decode(format!(
            "channel count changed mid-stream from {channels} to {frame_channels}"
        )));
    }
    Ok(channels)
}
