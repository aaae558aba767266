//! `StubClassifier`: deterministic energy-based backend without a model.
//!
//! Used by tests and the CLI `--stub` flag so the full
//! source → segmenter → classifier → aggregation path can be exercised
//! without model files.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::audio::AudioFormat;
use crate::buffering::window::Window;
use crate::error::{AudioClassError, Result};
use crate::inference::{AudioClassifier, Category, ClassificationResult, Delegate};

/// Label emitted for windows below the RMS threshold.
pub const SILENCE_LABEL: &str = "silence";

/// Energy stub.
///
/// For every window it emits a single-head result with two categories:
/// `"silence"` and the configured sound label, scored so that the silence
/// category wins whenever the window RMS is below `threshold`. An all-zero
/// window is therefore always `"silence"`.
pub struct StubClassifier {
    input_len: usize,
    format: Option<AudioFormat>,
    delegate: Delegate,
    threshold: f32,
    sound_label: String,
    fail_on_window: Option<usize>,
    /// Offsets of every window seen, in call order.
    seen: Arc<Mutex<Vec<usize>>>,
}

impl StubClassifier {
    pub fn new(input_len: usize) -> Self {
        Self {
            input_len,
            format: None,
            delegate: Delegate::Cpu,
            threshold: 0.01,
            sound_label: "sound".into(),
            fail_on_window: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Label for windows at or above the RMS threshold.
    pub fn with_sound_label(mut self, label: impl Into<String>) -> Self {
        self.sound_label = label.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Declare a required input format.
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delegate(mut self, delegate: Delegate) -> Self {
        self.delegate = delegate;
        self
    }

    /// Fail with `Classify` when asked to classify window `index`.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on_window = Some(index);
        self
    }

    /// Shared log of window offsets passed to `classify`.
    pub fn seen_offsets(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.seen)
    }

    fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }
}

impl AudioClassifier for StubClassifier {
    fn required_input_len(&self) -> usize {
        self.input_len
    }

    fn required_format(&self) -> Option<AudioFormat> {
        self.format
    }

    fn delegate(&self) -> Delegate {
        self.delegate
    }

    fn classify(&mut self, window: &Window<'_>) -> Result<ClassificationResult> {
        self.seen.lock().push(window.offset());

        if self.fail_on_window == Some(window.index()) {
            return Err(AudioClassError::Classify(format!(
                "stub failure on window {}",
                window.index()
            )));
        }

        let rms = Self::rms(window.samples());
        let loud = rms >= self.threshold;
        let sound_score = if loud { 0.5 + 0.5 * rms.min(1.0) } else { 0.0 };
        debug!(index = window.index(), rms, loud, "StubClassifier::classify");

        Ok(ClassificationResult::single_head(vec![
            Category::new(0, 1.0 - sound_score, SILENCE_LABEL),
            Category::new(1, sound_score, self.sound_label.clone()),
        ]))
    }
}
