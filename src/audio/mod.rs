//! PCM audio handling: decode, resample to mono, encode as canonical WAV.
//!
//! The pipeline is deliberately simple: nearest-neighbour decimation of the
//! first channel followed by 16-bit PCM serialization. It trades fidelity for
//! a predictable, deterministic size reduction.

pub mod decode;
pub mod pcm;
pub mod resample;
pub mod wav;

pub use decode::decode_audio;
pub use pcm::PcmBuffer;
pub use resample::resample_mono;
pub use wav::{decode_wav, encode_wav, EncodedAudio};

use crate::error::Result;

/// Resample `buffer` to mono at `target_rate` and serialize it as WAV.
pub fn resample_and_encode(buffer: &PcmBuffer, target_rate: u32) -> Result<EncodedAudio> {
    let mono = resample_mono(buffer, target_rate)?;
    encode_wav(&mono)
}
