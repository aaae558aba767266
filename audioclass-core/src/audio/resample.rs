//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! Audio event models are trained at a fixed rate (commonly 16 kHz mono),
//! while WAV files arrive at whatever rate they were recorded. `RateConverter`
//! bridges that gap before segmentation, so windows are cut in the model's
//! sample domain.
//!
//! When source rate == target rate, `RateConverter` is a passthrough and no
//! rubato session is created at all.
//!
//! ## Usage
//!
//! ```ignore
//! let resampled = conform_sample_rate(&audio, 16_000)?; // AudioSamples at 16 kHz
//! ```

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::info;

use super::{AudioFormat, AudioSamples};
use crate::error::{AudioClassError, Result};

/// Input frame count per rubato call.
pub const DEFAULT_CHUNK: usize = 1_024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer; holds partial input chunks between calls.
    input_buf: Vec<f32>,
    /// How many input samples rubato expects per process call.
    chunk_size: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Errors
    /// Returns `AudioClassError::InvalidArgument` if rubato fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / source_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| AudioClassError::InvalidArgument(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        info!(
            source_rate,
            target_rate, chunk_size, max_out, "resampling enabled"
        );

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            chunk_size,
            output_buf,
        })
    }

    /// Process incoming samples, returning resampled output (may be empty).
    ///
    /// Samples are accumulated internally until a full `chunk_size` block is
    /// available for rubato. Any remainder is kept for the next call or for
    /// [`RateConverter::flush`].
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(samples.to_vec());
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();
        let mut read = 0;

        while self.input_buf.len() - read >= self.chunk_size {
            let input_slice = &self.input_buf[read..read + self.chunk_size];
            let (_consumed, produced) = resampler
                .process_into_buffer(&[input_slice], &mut self.output_buf, None)
                .map_err(|e| AudioClassError::Other(anyhow::anyhow!("resampler: {e}")))?;
            result.extend_from_slice(&self.output_buf[0][..produced]);
            read += self.chunk_size;
        }
        // One shift per call; the remainder is always shorter than a chunk.
        self.input_buf.drain(..read);

        Ok(result)
    }

    /// Push out whatever is left in the accumulation buffer (zero-padded by
    /// rubato to a full chunk).
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(Vec::new());
        };
        if self.input_buf.is_empty() {
            return Ok(Vec::new());
        }

        let tail: &[&[f32]] = &[&self.input_buf[..]];
        let (_consumed, produced) = resampler
            .process_partial_into_buffer(Some(tail), &mut self.output_buf, None)
            .map_err(|e| AudioClassError::Other(anyhow::anyhow!("resampler: {e}")))?;
        self.input_buf.clear();
        Ok(self.output_buf[0][..produced].to_vec())
    }

    /// Frames of latency the resampler adds to the head of its output.
    pub fn output_delay(&self) -> usize {
        self.resampler.as_ref().map_or(0, |r| r.output_delay())
    }

    /// Returns `true` when source rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

/// Resample mono `audio` to `target_rate`.
///
/// The output is trimmed of resampler latency and sized to
/// `round(frames * target_rate / source_rate)` so downstream windowing sees
/// the same duration as the source.
///
/// # Errors
/// `InvalidArgument` for multi-channel input or a zero target rate.
pub fn conform_sample_rate(audio: &AudioSamples, target_rate: u32) -> Result<AudioSamples> {
    if target_rate == 0 {
        return Err(AudioClassError::InvalidArgument(
            "target sample rate must be positive".into(),
        ));
    }
    if audio.sample_rate() == target_rate {
        return Ok(audio.clone());
    }
    if audio.channels() != 1 {
        return Err(AudioClassError::InvalidArgument(format!(
            "resampling supports mono input only, got {} channels",
            audio.channels()
        )));
    }

    if audio.is_empty() {
        return AudioSamples::new(Vec::new(), AudioFormat::new(1, target_rate)?);
    }

    let expected = (audio.len() as f64 * target_rate as f64 / audio.sample_rate() as f64).round()
        as usize;

    let mut rc = RateConverter::new(audio.sample_rate(), target_rate, DEFAULT_CHUNK)?;
    let delay = rc.output_delay();
    let mut out = Vec::with_capacity(expected + delay);
    for chunk in audio.samples().chunks(DEFAULT_CHUNK) {
        out.extend(rc.process(chunk)?);
    }
    out.extend(rc.flush()?);
    // Drain the delay line so the tail of the clip is not lost.
    while out.len() < expected + delay {
        let tail = rc.process(&vec![0.0; DEFAULT_CHUNK])?;
        if tail.is_empty() {
            break;
        }
        out.extend(tail);
    }

    let mut out: Vec<f32> = out.into_iter().skip(delay).collect();
    out.resize(expected, 0.0);

    AudioSamples::new(
        out,
        AudioFormat {
            channels: 1,
            sample_rate: target_rate,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_identity() {
        let mut rc = RateConverter::new(16_000, 16_000, 960).unwrap();
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let out = rc.process(&samples).unwrap();
        assert_eq!(out, samples);
        assert!(rc.flush().unwrap().is_empty());
    }

    #[test]
    fn ratio_48k_to_16k_correct_length() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(!rc.is_passthrough());
        // 960 input samples at 48 kHz → ~320 at 16 kHz
        let out = rc.process(&vec![0.0f32; 960]).unwrap();
        assert!(!out.is_empty(), "expected non-empty output");
        assert!(
            (out.len() as isize - 320).unsigned_abs() <= 10,
            "output len={} expected≈320",
            out.len()
        );
    }

    #[test]
    fn partial_accumulation_waits_for_flush() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        let out = rc.process(&vec![0.0f32; 500]).unwrap();
        assert!(out.is_empty(), "expected empty output for partial chunk");
        let flushed = rc.flush().unwrap();
        assert!(!flushed.is_empty(), "flush should emit the buffered tail");
    }

    #[test]
    fn conform_sizes_output_to_duration() {
        let fmt = AudioFormat::new(1, 44_100).unwrap();
        let audio = AudioSamples::new(vec![0.1; 44_100], fmt).unwrap();
        let out = conform_sample_rate(&audio, 16_000).unwrap();
        assert_eq!(out.sample_rate(), 16_000);
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn process_consumes_large_buffers_in_one_call() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        let out = rc.process(&vec![0.0f32; 960 * 500 + 100]).unwrap();
        assert!((out.len() as isize - 320 * 500).unsigned_abs() <= 10);
        // Only the sub-chunk remainder is left for flush.
        let tail = rc.flush().unwrap();
        assert!(tail.len() <= 330);
    }

    #[test]
    fn conform_handles_multi_minute_clips() {
        let fmt = AudioFormat::new(1, 44_100).unwrap();
        let seconds = 240;
        let samples: Vec<f32> = (0..44_100 * seconds)
            .map(|i| (i as f32 * 0.01).sin() * 0.25)
            .collect();
        let audio = AudioSamples::new(samples, fmt).unwrap();

        let out = conform_sample_rate(&audio, 16_000).unwrap();
        assert_eq!(out.len(), 16_000 * seconds);
        assert!(out.samples().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn conform_rejects_stereo() {
        let fmt = AudioFormat::new(2, 44_100).unwrap();
        let audio = AudioSamples::new(vec![0.0; 8], fmt).unwrap();
        assert!(matches!(
            conform_sample_rate(&audio, 16_000),
            Err(AudioClassError::InvalidArgument(_))
        ));
    }

    #[test]
    fn conform_same_rate_is_clone() {
        let audio = AudioSamples::from_row(&[0.5, -0.5], AudioFormat::default()).unwrap();
        assert_eq!(conform_sample_rate(&audio, 16_000).unwrap(), audio);
    }
}
