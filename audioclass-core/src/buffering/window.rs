//! Fixed-length window segmentation.
//!
//! ## Algorithm
//!
//! 1. Start at offset 0.
//! 2. While at least `window_length` samples remain, emit exactly
//!    `window_length` samples and advance by `window_length`.
//! 3. Emit the non-empty remainder as a final, shorter window.
//!
//! Windows are borrowed views in strict left-to-right order. The sequence is
//! lazy and finite: nothing beyond the current window boundary is touched.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::audio::{AudioFormat, AudioSamples};
use crate::error::{AudioClassError, Result};

/// How much of the input gets classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifyMode {
    /// Only the first window; everything after it is discarded.
    SingleShot,
    /// Every window, in order.
    FullStream,
}

impl std::fmt::Display for ClassifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ClassifyMode::SingleShot => "single-shot",
            ClassifyMode::FullStream => "full-stream",
        })
    }
}

/// What to do with a window shorter than the classifier's required length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortWindowPolicy {
    /// Copy into a zero-filled buffer of the required length.
    #[default]
    ZeroPad,
    /// Fail with `InvalidArgument`.
    Reject,
    /// Hand the short slice to the classifier as-is.
    Forward,
}

impl ShortWindowPolicy {
    /// Bring `window` up to `required` samples according to this policy.
    ///
    /// Full-length windows pass through untouched. `scratch` backs the padded
    /// copy so the returned window can stay a borrowed view.
    pub fn apply<'s>(
        self,
        window: Window<'s>,
        required: usize,
        scratch: &'s mut Vec<f32>,
    ) -> Result<Window<'s>> {
        if window.len() >= required {
            return Ok(window);
        }
        match self {
            ShortWindowPolicy::Forward => Ok(window),
            ShortWindowPolicy::Reject => Err(AudioClassError::InvalidArgument(format!(
                "window {} has {} samples, classifier requires {}",
                window.index(),
                window.len(),
                required
            ))),
            ShortWindowPolicy::ZeroPad => {
                scratch.clear();
                scratch.extend_from_slice(window.samples());
                scratch.resize(required, 0.0);
                Ok(Window::new(scratch, window.format(), window.index(), window.offset()))
            }
        }
    }
}

/// A contiguous, non-owning slice of an audio sample sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    samples: &'a [f32],
    format: AudioFormat,
    /// Position in the window sequence (0-based).
    index: usize,
    /// Offset of the first sample in the source sequence.
    offset: usize,
}

impl<'a> Window<'a> {
    pub fn new(samples: &'a [f32], format: AudioFormat, index: usize, offset: usize) -> Self {
        Self {
            samples,
            format,
            index,
            offset,
        }
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Start of this window in seconds from the beginning of the source.
    pub fn start_secs(&self) -> f64 {
        offset_secs(self.offset, self.format)
    }
}

/// Time of interleaved sample `offset` in a stream of `format`.
pub fn offset_secs(offset: usize, format: AudioFormat) -> f64 {
    let channels = usize::from(format.channels.max(1));
    (offset / channels) as f64 / format.sample_rate.max(1) as f64
}

/// Lazy iterator over consecutive windows of one `AudioSamples`.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    samples: &'a [f32],
    format: AudioFormat,
    window_length: usize,
    offset: usize,
    index: usize,
}

impl<'a> Windows<'a> {
    pub fn window_length(&self) -> usize {
        self.window_length
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.samples.len() {
            return None;
        }
        let end = (self.offset + self.window_length).min(self.samples.len());
        let window = Window::new(
            &self.samples[self.offset..end],
            self.format,
            self.index,
            self.offset,
        );
        self.offset = end;
        self.index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = window_count(self.samples.len() - self.offset, self.window_length);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows<'_> {}

impl FusedIterator for Windows<'_> {}

/// Split `audio` into windows of `window_length` samples.
///
/// # Errors
/// `InvalidArgument` if `window_length` is zero, or not a multiple of the
/// channel count (windows must stay frame-aligned).
pub fn segment(audio: &AudioSamples, window_length: usize) -> Result<Windows<'_>> {
    if window_length == 0 {
        return Err(AudioClassError::InvalidArgument(
            "window length must be positive".into(),
        ));
    }
    let ch = usize::from(audio.channels());
    if window_length % ch != 0 {
        return Err(AudioClassError::InvalidArgument(format!(
            "window length {window_length} is not a multiple of {ch} channels"
        )));
    }
    Ok(Windows {
        samples: audio.samples(),
        format: audio.format(),
        window_length,
        offset: 0,
        index: 0,
    })
}

/// `ceil(len / window_length)`; zero for an empty input.
pub fn window_count(len: usize, window_length: usize) -> usize {
    len.div_ceil(window_length)
}
