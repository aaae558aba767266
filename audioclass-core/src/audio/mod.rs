//! Decoded audio source.
//!
//! `AudioSamples` is the owned, immutable sample sequence every classification
//! invocation starts from. It is populated in one of two ways:
//!
//! - decoding a linear-16 PCM WAV file ([`wav`]),
//! - copying row 0 of a float matrix supplied by a host graph.
//!
//! Windows produced by the segmenter borrow from it; nothing mutates it after
//! construction.

pub mod resample;
pub mod wav;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{AudioClassError, Result};

/// Channel count + sample rate of an interleaved sample sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioFormat {
    /// Mono at 16 kHz, the rate audio event models are trained on.
    pub const MONO_16K: AudioFormat = AudioFormat {
        channels: 1,
        sample_rate: 16_000,
    };

    /// Build a format, rejecting zero channels or a zero sample rate.
    pub fn new(channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(AudioClassError::InvalidArgument(
                "channel count must be positive".into(),
            ));
        }
        if sample_rate == 0 {
            return Err(AudioClassError::InvalidArgument(
                "sample rate must be positive".into(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::MONO_16K
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ch @ {} Hz", self.channels, self.sample_rate)
    }
}

/// Interleaved f32 PCM samples at a known format.
///
/// Invariant: `samples.len() % channels == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSamples {
    samples: Vec<f32>,
    format: AudioFormat,
}

impl AudioSamples {
    /// Wrap an interleaved sample buffer.
    ///
    /// # Errors
    /// `InvalidArgument` if the format is degenerate or the sample count is not
    /// a whole number of frames.
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Result<Self> {
        let format = AudioFormat::new(format.channels, format.sample_rate)?;
        if samples.len() % usize::from(format.channels) != 0 {
            return Err(AudioClassError::InvalidArgument(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                format.channels
            )));
        }
        Ok(Self { samples, format })
    }

    /// Decode a linear-16 PCM WAV file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        wav::decode_file(path.as_ref())
    }

    /// Copy one row of floats. The row carries no metadata, so the caller
    /// states the format (usually [`AudioFormat::MONO_16K`]).
    ///
    /// Only fails if the row length is not a multiple of `format.channels`.
    pub fn from_row(row: &[f32], format: AudioFormat) -> Result<Self> {
        Self::new(row.to_vec(), format)
    }

    /// Copy row 0 of a matrix. A matrix with no rows yields empty samples.
    pub fn from_matrix(matrix: ArrayView2<'_, f32>, format: AudioFormat) -> Result<Self> {
        if matrix.nrows() == 0 {
            return Self::new(Vec::new(), format);
        }
        let row: Vec<f32> = matrix.row(0).iter().copied().collect();
        Self::new(row, format)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    /// Total interleaved sample count.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.format.sample_rate as f64
    }

    /// Keep only the leading `max_len` samples (rounded down to whole frames).
    ///
    /// Inputs already within the limit are returned unchanged.
    pub fn into_truncated(mut self, max_len: usize) -> Self {
        if self.samples.len() > max_len {
            let ch = usize::from(self.format.channels);
            self.samples.truncate(max_len - max_len % ch);
        }
        self
    }

    /// Average interleaved frames down to a single channel.
    pub fn to_mono(&self) -> AudioSamples {
        if self.format.channels == 1 {
            return self.clone();
        }
        AudioSamples {
            samples: downmix(&self.samples, usize::from(self.format.channels)),
            format: AudioFormat {
                channels: 1,
                sample_rate: self.format.sample_rate,
            },
        }
    }

    pub fn into_inner(self) -> (Vec<f32>, AudioFormat) {
        (self.samples, self.format)
    }
}

/// Average each `channels`-wide frame of `interleaved` into one sample.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
