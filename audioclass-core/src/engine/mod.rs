//! `Orchestrator`: end-to-end classification of one input.
//!
//! ## Flow (per invocation)
//!
//! ```text
//! AudioSource::load()            → AudioSamples
//!     └─► conform()              → downmix / resample to the classifier's format
//!         └─► segment()          → Windows (single-shot: first window only)
//!             └─► classify()     → one ClassificationResult per window, in order
//!                 └─► ClassificationRun
//! ```
//!
//! Failure at any stage aborts the invocation. Per-window failures are wrapped
//! with the window index and mode; results gathered before the failure are
//! discarded.
//!
//! ## Threading
//!
//! Everything runs on the calling thread. The classifier mutex is held for the
//! whole invocation, so two runs sharing one `ClassifierHandle` never
//! interleave windows.

pub mod run;

pub use run::{ClassificationRun, ClassifiedWindow};

use std::path::PathBuf;
use std::time::{Duration, Instant};

use ndarray::Array2;
use tracing::{debug, info, info_span, warn};

use crate::{
    audio::{resample::conform_sample_rate, AudioFormat, AudioSamples},
    buffering::window::{segment, ClassifyMode, ShortWindowPolicy},
    error::{AudioClassError, Result},
    inference::{AudioClassifier, ClassificationResult, ClassifierHandle},
};

/// Extra source frames kept past the first window before resampling, so the
/// interpolator sees real audio at the window edge.
const RESAMPLE_MARGIN_FRAMES: usize = 64;

/// Where the audio for one invocation comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Linear-16 PCM WAV file.
    File(PathBuf),
    /// Row 0 of a float matrix; the matrix carries no format, so it is stated.
    Matrix {
        data: Array2<f32>,
        format: AudioFormat,
    },
    /// Already-decoded samples.
    Samples(AudioSamples),
}

impl AudioSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        AudioSource::File(path.into())
    }

    /// Matrix input at the default mono 16 kHz format.
    pub fn matrix(data: Array2<f32>) -> Self {
        AudioSource::Matrix {
            data,
            format: AudioFormat::default(),
        }
    }

    pub fn load(&self) -> Result<AudioSamples> {
        match self {
            AudioSource::File(path) => AudioSamples::load_from_file(path),
            AudioSource::Matrix { data, format } => AudioSamples::from_matrix(data.view(), *format),
            AudioSource::Samples(samples) => Ok(samples.clone()),
        }
    }

    /// Short description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::File(path) => path.display().to_string(),
            AudioSource::Matrix { data, .. } => {
                format!("matrix[{}x{}]", data.nrows(), data.ncols())
            }
            AudioSource::Samples(s) => format!("samples[{}]", s.len()),
        }
    }
}

/// Configuration for `Orchestrator`.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Handling of windows shorter than the classifier's input length.
    /// Default: zero-pad.
    pub short_window: ShortWindowPolicy,
    /// Downmix / resample the source to the classifier's declared format
    /// before segmenting. Default: `true`.
    pub conform_format: bool,
    /// Upper bound on windows classified in full-stream mode.
    /// Default: `None` (every window).
    pub max_windows: Option<usize>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            short_window: ShortWindowPolicy::ZeroPad,
            conform_format: true,
            max_windows: None,
        }
    }
}

/// Drives source → segmenter → classifier → aggregation.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Classify the first window of `source` only.
    ///
    /// # Errors
    /// - `Decode` if the source cannot be decoded.
    /// - `InvalidArgument` if the source holds no samples.
    /// - `Window { .. }` wrapping the classifier's error.
    pub fn classify_single(
        &self,
        classifier: &ClassifierHandle,
        source: &AudioSource,
    ) -> Result<ClassificationRun> {
        self.classify(classifier, source, ClassifyMode::SingleShot)
    }

    /// Classify every window of `source`, in order. An empty source yields
    /// an empty run without touching the classifier.
    ///
    /// # Errors
    /// The first failure aborts the run; see [`Orchestrator::classify_single`].
    pub fn classify_stream(
        &self,
        classifier: &ClassifierHandle,
        source: &AudioSource,
    ) -> Result<ClassificationRun> {
        self.classify(classifier, source, ClassifyMode::FullStream)
    }

    /// Classify `source` in the given mode.
    pub fn classify(
        &self,
        classifier: &ClassifierHandle,
        source: &AudioSource,
        mode: ClassifyMode,
    ) -> Result<ClassificationRun> {
        let input = source.describe();
        let span = info_span!("classify", %mode, input = %input);
        let _enter = span.enter();

        let audio = source.load()?;
        let mut model = classifier.0.lock();
        self.classify_samples(&mut *model, audio, input, mode)
    }

    /// Classify already-loaded samples with a borrowed classifier.
    pub fn classify_samples(
        &self,
        model: &mut dyn AudioClassifier,
        audio: AudioSamples,
        input: String,
        mode: ClassifyMode,
    ) -> Result<ClassificationRun> {
        let window_length = model.required_input_len();
        let delegate = model.delegate();
        let required = model.required_format();

        let audio = match mode {
            ClassifyMode::SingleShot => {
                if audio.is_empty() {
                    return Err(AudioClassError::InvalidArgument(
                        "no samples to classify".into(),
                    ));
                }
                let prefix = self.single_shot_prefix(audio, window_length, required);
                self.conform(prefix, required)?
                    .into_truncated(window_length)
            }
            ClassifyMode::FullStream => self.conform(audio, required)?,
        };

        let windows = segment(&audio, window_length)?;
        let windows_total = windows.len();
        let budget = match mode {
            ClassifyMode::SingleShot => 1,
            ClassifyMode::FullStream => self.config.max_windows.unwrap_or(usize::MAX),
        };
        if windows_total > budget && mode == ClassifyMode::FullStream {
            warn!(
                windows_total,
                budget, "window budget reached; remaining windows are not classified"
            );
        }

        let mut classified = Vec::with_capacity(windows_total.min(budget));
        let mut scratch = Vec::new();
        let mut elapsed = Duration::ZERO;

        for window in windows.take(budget) {
            let index = window.index();
            let offset = window.offset();
            let len = window.len();
            let window = self
                .config
                .short_window
                .apply(window, window_length, &mut scratch)
                .map_err(|e| e.at_window(mode, index))?;

            let start = Instant::now();
            let outcome = model.classify(&window);
            elapsed += start.elapsed();

            let result = outcome
                .and_then(ClassificationResult::ensure_non_empty)
                .map_err(|e| e.at_window(mode, index))?;
            debug!(index, offset, label = result.top_label(), "window classified");

            classified.push(ClassifiedWindow {
                index,
                offset,
                len,
                result,
            });
        }

        info!(
            windows = classified.len(),
            windows_total,
            "time cost to classify the input audio clip on {}: {:.3} ms",
            delegate,
            elapsed.as_secs_f64() * 1_000.0
        );

        Ok(ClassificationRun {
            input,
            mode,
            format: audio.format(),
            window_length,
            windows_total,
            windows: classified,
            elapsed,
            delegate,
        })
    }

    /// Cut `audio` down to the source span that conforms into the first
    /// window, so single-shot runs never resample audio they discard.
    fn single_shot_prefix(
        &self,
        audio: AudioSamples,
        window_length: usize,
        required: Option<AudioFormat>,
    ) -> AudioSamples {
        let src_channels = usize::from(audio.channels());
        let frames = match required {
            Some(req) if self.config.conform_format => {
                // Downmix only ever lowers the channel count.
                let out_channels = usize::from(req.channels.min(audio.channels()).max(1));
                let out_frames = window_length.div_ceil(out_channels);
                if req.sample_rate == audio.sample_rate() {
                    out_frames
                } else {
                    let src = out_frames as u64 * u64::from(audio.sample_rate());
                    src.div_ceil(u64::from(req.sample_rate)) as usize + RESAMPLE_MARGIN_FRAMES
                }
            }
            _ => window_length.div_ceil(src_channels),
        };
        audio.into_truncated(frames.saturating_mul(src_channels))
    }

    fn conform(&self, audio: AudioSamples, required: Option<AudioFormat>) -> Result<AudioSamples> {
        let Some(required) = required else {
            return Ok(audio);
        };
        if audio.format() == required {
            return Ok(audio);
        }
        if !self.config.conform_format {
            warn!(
                source = %audio.format(),
                required = %required,
                "source format differs from the classifier's; passing through"
            );
            return Ok(audio);
        }

        let mut audio = audio;
        if required.channels == 1 && audio.channels() > 1 {
            debug!(channels = audio.channels(), "downmixing to mono");
            audio = audio.to_mono();
        }
        if audio.channels() == 1 && audio.sample_rate() != required.sample_rate {
            info!(
                from = audio.sample_rate(),
                to = required.sample_rate,
                "resampling source audio"
            );
            audio = conform_sample_rate(&audio, required.sample_rate)?;
        }
        if audio.format() != required {
            warn!(
                source = %audio.format(),
                required = %required,
                "could not conform source format; passing through"
            );
        }
        Ok(audio)
    }
}

/// Classify the first window of a WAV file with an ONNX model, building the
/// classifier for `delegate`.
#[cfg(feature = "onnx")]
pub fn classify_file(
    model_path: impl Into<PathBuf>,
    audio_path: impl Into<PathBuf>,
    delegate: crate::inference::Delegate,
) -> Result<ClassificationResult> {
    use crate::inference::{OnnxClassifier, OnnxClassifierConfig};

    let classifier = OnnxClassifier::load(OnnxClassifierConfig::new(model_path).with_delegate(delegate))?;
    let handle = ClassifierHandle::new(classifier);
    let run = Orchestrator::default().classify_single(&handle, &AudioSource::file(audio_path))?;
    run.windows
        .into_iter()
        .next()
        .map(|w| w.result)
        .ok_or_else(|| AudioClassError::Classify("run produced no results".into()))
}
