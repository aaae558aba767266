//! Linear-16 PCM WAV decoding via `hound`.
//!
//! Only 16-bit integer PCM is accepted; anything else is a decode error rather
//! than a silent conversion, so a model never sees audio scaled differently
//! from what it was trained on.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use super::{AudioFormat, AudioSamples};
use crate::error::{AudioClassError, Result};

/// Full-scale divisor for i16 → f32 in `[-1.0, 1.0)`.
const I16_SCALE: f32 = 32_768.0;

/// Decode the WAV file at `path`.
///
/// # Errors
/// `Decode` if the file cannot be opened, is not a RIFF/WAVE stream, or is not
/// 16-bit integer PCM.
pub fn decode_file(path: &Path) -> Result<AudioSamples> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| AudioClassError::Decode(format!("{}: {e}", path.display())))?;
    let audio = decode_reader(reader)?;
    debug!(
        path = %path.display(),
        samples = audio.len(),
        format = %audio.format(),
        "decoded wav file"
    );
    Ok(audio)
}

/// Decode an in-memory WAV byte stream.
pub fn decode_bytes(bytes: &[u8]) -> Result<AudioSamples> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes))
        .map_err(|e| AudioClassError::Decode(e.to_string()))?;
    decode_reader(reader)
}

fn decode_reader<R: Read>(mut reader: hound::WavReader<R>) -> Result<AudioSamples> {
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioClassError::Decode(format!(
            "expected 16-bit linear PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .samples::<i16>()
        .map(|s| {
            s.map(|v| v as f32 / I16_SCALE)
                .map_err(|e| AudioClassError::Decode(e.to_string()))
        })
        .collect::<Result<Vec<f32>>>()?;

    let format = AudioFormat::new(spec.channels, spec.sample_rate)
        .map_err(|e| AudioClassError::Decode(e.to_string()))?;
    AudioSamples::new(samples, format).map_err(|e| AudioClassError::Decode(e.to_string()))
}
