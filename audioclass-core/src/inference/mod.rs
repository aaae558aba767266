//! Classifier abstraction.
//!
//! The `AudioClassifier` trait decouples the orchestrator from any specific
//! backend (energy stub, ONNX audio event model, etc.).
//!
//! `&mut self` on `classify` expresses that inference sessions are not
//! reentrant. All mutation is therefore serialised through
//! `ClassifierHandle`'s `parking_lot::Mutex`.

pub mod labels;
pub mod result;
pub mod scoring;
pub mod stub;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxClassifier, OnnxClassifierConfig};

pub use labels::LabelMap;
pub use result::{Category, ClassificationResult, Classifications};
pub use scoring::ScoreOptions;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::buffering::window::Window;
use crate::error::Result;

/// Compute backend the inference engine runs on.
///
/// Chosen once when the classifier is built; the orchestrator only reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    #[default]
    Cpu,
    Accelerator,
}

impl Delegate {
    /// Map the legacy `use_accelerator` flag.
    pub fn from_flag(use_accelerator: bool) -> Self {
        if use_accelerator {
            Delegate::Accelerator
        } else {
            Delegate::Cpu
        }
    }

    /// Human-readable label for logs.
    pub fn label(self) -> &'static str {
        match self {
            Delegate::Cpu => "CPU",
            Delegate::Accelerator => "Accelerator",
        }
    }
}

impl std::fmt::Display for Delegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Contract for audio classification backends.
pub trait AudioClassifier: Send + 'static {
    /// Samples (across all channels) the model consumes per inference.
    fn required_input_len(&self) -> usize;

    /// Format the model was trained on, if it declares one.
    fn required_format(&self) -> Option<AudioFormat> {
        None
    }

    /// Backend this classifier was built for.
    fn delegate(&self) -> Delegate {
        Delegate::Cpu
    }

    /// Classify one window.
    ///
    /// The window is normally exactly `required_input_len()` samples; it is
    /// shorter only when the caller forwards short windows unpadded.
    ///
    /// # Errors
    /// Model not loaded, malformed input, or any engine failure.
    fn classify(&mut self, window: &Window<'_>) -> Result<ClassificationResult>;
}

/// Thread-safe reference-counted handle to any `AudioClassifier` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic (unlike
/// `std::sync::Mutex`). Sharing one handle across threads is safe; calls are
/// serialised.
#[derive(Clone)]
pub struct ClassifierHandle(pub Arc<Mutex<dyn AudioClassifier>>);

impl ClassifierHandle {
    /// Wrap any `AudioClassifier` in a `ClassifierHandle`.
    pub fn new<C: AudioClassifier>(classifier: C) -> Self {
        Self(Arc::new(Mutex::new(classifier)))
    }

    pub fn required_input_len(&self) -> usize {
        self.0.lock().required_input_len()
    }

    pub fn required_format(&self) -> Option<AudioFormat> {
        self.0.lock().required_format()
    }

    pub fn delegate(&self) -> Delegate {
        self.0.lock().delegate()
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle").finish_non_exhaustive()
    }
}
