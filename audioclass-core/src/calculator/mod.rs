//! Graph-node adapter.
//!
//! Maps host-style tagged ports onto orchestrator calls:
//!
//! | Tag          | Kind        | Type            | Used by                  |
//! |--------------|-------------|-----------------|--------------------------|
//! | `MODEL_PATH` | side packet | path string     | both                     |
//! | `AUDIO_PATH` | side packet | path string     | `BatchFileCalculator`    |
//! | `DATA`       | input       | `Array2<f32>`   | `SingleBufferCalculator` |
//! | `CLASS`      | output      | `String`        | `SingleBufferCalculator` |
//! | `CLASSES`    | output      | `Vec<String>`   | `BatchFileCalculator`    |
//!
//! The classifier is built once in `open`; `process` reuses it. Batch errors
//! are returned to the caller. Single-buffer errors are logged and the packet
//! is dropped, so one bad buffer does not stop the stream.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{error, info};

use crate::{
    audio::AudioFormat,
    engine::{AudioSource, ClassificationRun, Orchestrator, OrchestratorConfig},
    error::{AudioClassError, Result},
    inference::{ClassifierHandle, Delegate},
};

pub const MODEL_PATH: &str = "MODEL_PATH";
pub const AUDIO_PATH: &str = "AUDIO_PATH";
pub const DATA: &str = "DATA";
pub const CLASS: &str = "CLASS";
pub const CLASSES: &str = "CLASSES";

/// String-valued side packets keyed by tag.
#[derive(Debug, Clone, Default)]
pub struct SidePackets(HashMap<String, String>);

impl SidePackets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: &str, value: impl Into<String>) -> Self {
        self.insert(tag, value);
        self
    }

    pub fn insert(&mut self, tag: &str, value: impl Into<String>) {
        self.0.insert(tag.to_string(), value.into());
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    /// # Errors
    /// `InvalidArgument` if `tag` is missing or blank.
    pub fn require(&self, tag: &str) -> Result<&str> {
        self.get(tag)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AudioClassError::InvalidArgument(format!("missing side packet {tag}")))
    }
}

/// Host stream timestamp (opaque ticks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub struct Packet<T> {
    pub value: T,
    pub timestamp: Timestamp,
}

impl<T> Packet<T> {
    pub fn at(value: T, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }
}

/// Builds the classifier a calculator runs with.
pub trait ClassifierLoader {
    fn load(&self, model_path: &Path, delegate: Delegate) -> Result<ClassifierHandle>;
}

impl<F> ClassifierLoader for F
where
    F: Fn(&Path, Delegate) -> Result<ClassifierHandle>,
{
    fn load(&self, model_path: &Path, delegate: Delegate) -> Result<ClassifierHandle> {
        self(model_path, delegate)
    }
}

/// Loads an `OnnxClassifier` from a config template.
///
/// The template supplies labels, scoring and input-length options; the model
/// path and delegate come from the calculator.
#[cfg(feature = "onnx")]
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    template: crate::inference::OnnxClassifierConfig,
}

#[cfg(feature = "onnx")]
impl OnnxLoader {
    pub fn new(template: crate::inference::OnnxClassifierConfig) -> Self {
        Self { template }
    }

    /// Config for one model, built from the template.
    pub fn config_for(
        &self,
        model_path: &Path,
        delegate: Delegate,
    ) -> crate::inference::OnnxClassifierConfig {
        crate::inference::OnnxClassifierConfig {
            model_path: model_path.to_path_buf(),
            delegate,
            ..self.template.clone()
        }
    }
}

#[cfg(feature = "onnx")]
impl Default for OnnxLoader {
    fn default() -> Self {
        Self::new(crate::inference::OnnxClassifierConfig::new(PathBuf::new()))
    }
}

#[cfg(feature = "onnx")]
impl ClassifierLoader for OnnxLoader {
    fn load(&self, model_path: &Path, delegate: Delegate) -> Result<ClassifierHandle> {
        let config = self.config_for(model_path, delegate);
        Ok(ClassifierHandle::new(crate::inference::OnnxClassifier::load(config)?))
    }
}

/// Options shared by both calculators.
#[derive(Debug, Clone, Default)]
pub struct CalculatorOptions {
    pub delegate: Delegate,
    pub orchestrator: OrchestratorConfig,
    /// Format of `DATA` matrices. Default: mono 16 kHz.
    pub input_format: AudioFormat,
}

fn open_classifier<L>(
    side_packets: &SidePackets,
    loader: &L,
    delegate: Delegate,
) -> Result<ClassifierHandle>
where
    L: ClassifierLoader + ?Sized,
{
    let model_path = Path::new(side_packets.require(MODEL_PATH)?);
    let classifier = loader.load(model_path, delegate)?;
    info!(
        model = %model_path.display(),
        %delegate,
        window_length = classifier.required_input_len(),
        "calculator opened"
    );
    Ok(classifier)
}

// ── Batch file ───────────────────────────────────────────────────────────────

/// Classifies a whole WAV file, window by window.
pub struct BatchFileCalculator {
    classifier: ClassifierHandle,
    audio_path: PathBuf,
    orchestrator: Orchestrator,
}

impl BatchFileCalculator {
    /// # Errors
    /// `InvalidArgument` if `MODEL_PATH` or `AUDIO_PATH` is missing; any
    /// loader error.
    pub fn open<L>(side_packets: &SidePackets, loader: &L, options: CalculatorOptions) -> Result<Self>
    where
        L: ClassifierLoader + ?Sized,
    {
        let audio_path = PathBuf::from(side_packets.require(AUDIO_PATH)?);
        let classifier = open_classifier(side_packets, loader, options.delegate)?;
        Ok(Self {
            classifier,
            audio_path,
            orchestrator: Orchestrator::new(options.orchestrator),
        })
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Full-stream run over `AUDIO_PATH`.
    pub fn run(&self) -> Result<ClassificationRun> {
        self.orchestrator
            .classify_stream(&self.classifier, &AudioSource::File(self.audio_path.clone()))
    }

    /// `CLASSES` output: the top label of every window, in order.
    ///
    /// # Errors
    /// The first decode or classification failure.
    pub fn process(&self) -> Result<Vec<String>> {
        self.run()?.top_labels()
    }
}

// ── Single buffer ────────────────────────────────────────────────────────────

/// Classifies one `DATA` matrix per input packet.
pub struct SingleBufferCalculator {
    classifier: ClassifierHandle,
    orchestrator: Orchestrator,
    input_format: AudioFormat,
}

impl SingleBufferCalculator {
    /// # Errors
    /// `InvalidArgument` if `MODEL_PATH` is missing; any loader error.
    pub fn open<L>(side_packets: &SidePackets, loader: &L, options: CalculatorOptions) -> Result<Self>
    where
        L: ClassifierLoader + ?Sized,
    {
        let classifier = open_classifier(side_packets, loader, options.delegate)?;
        Ok(Self {
            classifier,
            orchestrator: Orchestrator::new(options.orchestrator),
            input_format: options.input_format,
        })
    }

    /// Classify row 0 of the packet single-shot and emit its top label as
    /// `CLASS` at the input timestamp. Failures are logged and yield `None`.
    pub fn process(&self, packet: Packet<Array2<f32>>) -> Option<Packet<String>> {
        let timestamp = packet.timestamp;
        let source = AudioSource::Matrix {
            data: packet.value,
            format: self.input_format,
        };
        match self
            .orchestrator
            .classify_single(&self.classifier, &source)
            .and_then(|run| run.top_label())
        {
            Ok(label) => Some(Packet::at(label, timestamp)),
            Err(e) => {
                error!(timestamp = timestamp.0, cause = %e.root(), "classification failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::stub::StubClassifier;

    fn stub_loader(path: &Path, _delegate: Delegate) -> Result<ClassifierHandle> {
        assert_eq!(path, Path::new("model.onnx"));
        Ok(ClassifierHandle::new(StubClassifier::new(8)))
    }

    #[test]
    fn missing_model_path_is_rejected() {
        let err = SingleBufferCalculator::open(
            &SidePackets::new(),
            &stub_loader,
            CalculatorOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AudioClassError::InvalidArgument(_)));
    }

    #[test]
    fn batch_requires_audio_path() {
        let side = SidePackets::new().with(MODEL_PATH, "model.onnx");
        let err = BatchFileCalculator::open(&side, &stub_loader, CalculatorOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains(AUDIO_PATH));
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn onnx_loader_keeps_template_options() {
        use crate::inference::{OnnxClassifierConfig, ScoreOptions};

        let mut template = OnnxClassifierConfig::new("ignored.onnx");
        template.labels_path = Some(PathBuf::from("labels.txt"));
        template.scoring = ScoreOptions {
            max_results: Some(3),
            score_threshold: Some(0.2),
        };
        let loader = OnnxLoader::new(template);

        let config = loader.config_for(Path::new("yamnet.onnx"), Delegate::Accelerator);
        assert_eq!(config.model_path, PathBuf::from("yamnet.onnx"));
        assert_eq!(config.delegate, Delegate::Accelerator);
        assert_eq!(config.labels_path, Some(PathBuf::from("labels.txt")));
        assert_eq!(config.scoring.max_results, Some(3));
    }

    #[test]
    fn blank_side_packet_counts_as_missing() {
        let side = SidePackets::new().with(MODEL_PATH, "  ");
        assert!(side.require(MODEL_PATH).is_err());
    }

    #[test]
    fn loud_buffer_gets_sound_label() {
        let side = SidePackets::new().with(MODEL_PATH, "model.onnx");
        let calc =
            SingleBufferCalculator::open(&side, &stub_loader, CalculatorOptions::default()).unwrap();
        let data = Array2::from_elem((1, 8), 0.5_f32);
        let out = calc.process(Packet::at(data, Timestamp(7))).unwrap();
        assert_eq!(out.value, "sound");
        assert_eq!(out.timestamp, Timestamp(7));
    }

    #[test]
    fn empty_matrix_is_dropped() {
        let side = SidePackets::new().with(MODEL_PATH, "model.onnx");
        let calc =
            SingleBufferCalculator::open(&side, &stub_loader, CalculatorOptions::default()).unwrap();
        let data = Array2::<f32>::zeros((0, 0));
        assert!(calc.process(Packet::at(data, Timestamp(1))).is_none());
    }
}
