//! # audioclass-core
//!
//! Offline and streaming audio event classification SDK.
//!
//! ## Architecture
//!
//! ```text
//! WAV file / Array2 row → AudioSamples ─► conform (downmix, rubato resample)
//!                                             │
//!                                       segment() → Windows
//!                                             │
//!                                 AudioClassifier::classify (per window)
//!                                             │
//!                               ClassificationRun → RunReport / labels
//! ```
//!
//! `calculator` wraps the orchestrator in tagged-port graph nodes. All work
//! runs synchronously on the caller's thread.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod calculator;
pub mod engine;
pub mod error;
pub mod inference;
pub mod report;

// Convenience re-exports for downstream crates
pub use audio::{AudioFormat, AudioSamples};
pub use buffering::{segment, ClassifyMode, ShortWindowPolicy, Window};
pub use engine::{AudioSource, ClassificationRun, Orchestrator, OrchestratorConfig};
pub use error::{AudioClassError, Result};
pub use inference::{AudioClassifier, ClassificationResult, ClassifierHandle, Delegate};
pub use report::RunReport;

#[cfg(feature = "onnx")]
pub use engine::classify_file;

#[cfg(feature = "onnx")]
pub use inference::{OnnxClassifier, OnnxClassifierConfig};
