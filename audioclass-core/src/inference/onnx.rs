//! Audio event classifier ONNX backend via the `ort` crate.
//!
//! Targets waveform-in / scores-out exports such as YAMNet:
//! - input  `waveform`: `[N]` or `[1, N]` f32 mono at 16 kHz
//! - output `scores`:   `[frames, classes]` (or `[1, classes]`)
//! - labels:            AudioSet `class_map.csv` or one label per line
//!
//! Per-frame score rows are averaged into one score vector per window.
//!
//! ## Delegates
//!
//! | Delegate      | Windows                   | Elsewhere           |
//! |---------------|---------------------------|---------------------|
//! | `Cpu`         | CPU EP                    | CPU EP              |
//! | `Accelerator` | DirectML (strict) → CPU   | CPU EP + warning    |

use std::path::{Path, PathBuf};

use ort::ep;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::TensorRef;
use tracing::{debug, info, warn};

use crate::{
    audio::AudioFormat,
    buffering::window::Window,
    error::{AudioClassError, Result},
    inference::{
        labels::LabelMap,
        scoring::{self, ScoreOptions},
        AudioClassifier, ClassificationResult, Delegate,
    },
};

/// Input length used when the model's input dimension is dynamic:
/// 0.975 s at 16 kHz, the YAMNet patch size.
pub const DEFAULT_INPUT_LEN: usize = 15_600;

/// Label map file looked up next to the model when none is configured.
const DEFAULT_LABELS_FILE: &str = "class_map.csv";

// ── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OnnxClassifierConfig {
    pub model_path: PathBuf,
    /// `None` → `class_map.csv` beside the model, if present.
    pub labels_path: Option<PathBuf>,
    pub delegate: Delegate,
    /// Fallback input length for models with a dynamic input dimension.
    pub input_len: usize,
    pub sample_rate: u32,
    pub scoring: ScoreOptions,
}

impl OnnxClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: None,
            delegate: Delegate::Cpu,
            input_len: DEFAULT_INPUT_LEN,
            sample_rate: AudioFormat::MONO_16K.sample_rate,
            scoring: ScoreOptions::default(),
        }
    }

    pub fn with_delegate(mut self, delegate: Delegate) -> Self {
        self.delegate = delegate;
        self
    }

    fn resolved_labels_path(&self) -> Option<PathBuf> {
        self.labels_path.clone().or_else(|| {
            self.model_path
                .parent()
                .map(|dir| dir.join(DEFAULT_LABELS_FILE))
                .filter(|p| p.exists())
        })
    }
}

fn create_session(model_path: &Path, delegate: Delegate) -> Result<Session> {
    let mut builder = SessionBuilder::new()
        .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::All)
        .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?;

    #[cfg(target_os = "windows")]
    {
        builder = match delegate {
            Delegate::Cpu => {
                info!("ONNX EP preference=cpu");
                builder
                    .with_execution_providers([ep::CPU::default().build()])
                    .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?
            }
            Delegate::Accelerator => {
                info!("ONNX EP preference=directml (strict)");
                builder
                    .with_execution_providers([
                        ep::DirectML::default()
                            .with_device_id(0)
                            .build()
                            .error_on_failure(),
                        ep::CPU::default().build(),
                    ])
                    .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?
            }
        };
    }

    #[cfg(not(target_os = "windows"))]
    {
        if delegate == Delegate::Accelerator {
            warn!("accelerator delegate requested on non-Windows host; using CPU EP");
        }
        builder = builder
            .with_execution_providers([ep::CPU::default().build()])
            .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?;
    }

    builder
        .commit_from_file(model_path)
        .map_err(|e| AudioClassError::OnnxSession(e.to_string()))
}

// ── OnnxClassifier ───────────────────────────────────────────────────────────

pub struct OnnxClassifier {
    config: OnnxClassifierConfig,
    session: Option<Session>,
    labels: LabelMap,
    input_name: String,
    /// 1 → `[N]`, 2 → `[1, N]`.
    input_rank: usize,
    output_name: String,
    input_len: usize,
}

impl OnnxClassifier {
    /// Create an unloaded classifier. Call [`OnnxClassifier::warm_up`] before use.
    pub fn new(config: OnnxClassifierConfig) -> Self {
        let input_len = config.input_len;
        Self {
            config,
            session: None,
            labels: LabelMap::default(),
            input_name: String::new(),
            input_rank: 1,
            output_name: String::new(),
            input_len,
        }
    }

    /// Create and warm up in one step.
    pub fn load(config: OnnxClassifierConfig) -> Result<Self> {
        let mut classifier = Self::new(config);
        classifier.warm_up()?;
        Ok(classifier)
    }

    /// Load the session and label map, resolve I/O names, and run one dummy
    /// inference.
    ///
    /// # Errors
    /// `ModelNotFound` if the model file is missing, `OnnxSession` if ort
    /// rejects it.
    pub fn warm_up(&mut self) -> Result<()> {
        let model_path = self.config.model_path.clone();
        if !model_path.exists() {
            return Err(AudioClassError::ModelNotFound { path: model_path });
        }
        let size_mb = std::fs::metadata(&model_path)
            .map(|m| m.len() as f64 / 1_048_576.0)
            .unwrap_or(0.0);
        info!(path = ?model_path, size_mb, delegate = %self.config.delegate, "loading classifier");

        let session = create_session(&model_path, self.config.delegate)?;

        let input = session.inputs().first().ok_or_else(|| {
            AudioClassError::OnnxSession("model declares no inputs".into())
        })?;
        self.input_name = input.name().to_string();
        if let Some(shape) = input.dtype().tensor_shape() {
            self.input_rank = shape.len().max(1);
            match shape.last().copied() {
                Some(n) if n > 0 => self.input_len = n as usize,
                _ => debug!(
                    fallback = self.config.input_len,
                    "dynamic input length; using configured length"
                ),
            }
        }

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        self.output_name = output_names
            .iter()
            .find(|n| n.to_ascii_lowercase().contains("score"))
            .or_else(|| output_names.first())
            .cloned()
            .ok_or_else(|| AudioClassError::OnnxSession("model declares no outputs".into()))?;

        info!(
            input = %self.input_name,
            input_rank = self.input_rank,
            input_len = self.input_len,
            output = %self.output_name,
            "classifier I/O resolved"
        );

        self.labels = match self.config.resolved_labels_path() {
            Some(path) => {
                let labels = LabelMap::load(&path)?;
                info!(path = ?path, classes = labels.len(), "label map loaded");
                labels
            }
            None => {
                warn!("no label map found; categories will be named by index");
                LabelMap::default()
            }
        };

        self.session = Some(session);

        let silence = vec![0f32; self.input_len];
        self.run_scores(&silence)?;
        info!("classifier warm-up complete");
        Ok(())
    }

    fn run_scores(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let session = self.session.as_mut().ok_or_else(|| {
            AudioClassError::Classify("model not loaded; call warm_up()".into())
        })?;
        let n = input.len() as i64;

        let outputs = if self.input_rank >= 2 {
            let tensor = TensorRef::from_array_view(([1_i64, n], input))
                .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?;
            session.run(ort::inputs![self.input_name.as_str() => tensor])
        } else {
            let tensor = TensorRef::from_array_view(([n], input))
                .map_err(|e| AudioClassError::OnnxSession(e.to_string()))?;
            session.run(ort::inputs![self.input_name.as_str() => tensor])
        }
        .map_err(|e| AudioClassError::Classify(e.to_string()))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| AudioClassError::Classify(e.to_string()))?;

        let n_classes = shape
            .last()
            .copied()
            .filter(|&c| c > 0)
            .map(|c| c as usize)
            .unwrap_or(data.len());
        Ok(scoring::mean_over_frames(data, n_classes))
    }
}

impl AudioClassifier for OnnxClassifier {
    fn required_input_len(&self) -> usize {
        self.input_len
    }

    fn required_format(&self) -> Option<AudioFormat> {
        Some(AudioFormat {
            channels: 1,
            sample_rate: self.config.sample_rate,
        })
    }

    fn delegate(&self) -> Delegate {
        self.config.delegate
    }

    fn classify(&mut self, window: &Window<'_>) -> Result<ClassificationResult> {
        if window.format().channels != 1 {
            return Err(AudioClassError::Classify(format!(
                "model expects mono input, window has {} channels",
                window.format().channels
            )));
        }

        let mut input = window.samples().to_vec();
        input.resize(self.input_len, 0.0);

        let scores = self.run_scores(&input)?;
        let categories = scoring::rank(&scores, &self.labels, self.config.scoring);
        debug!(
            index = window.index(),
            top = categories.first().map(|c| c.label.as_str()),
            "window classified"
        );
        Ok(ClassificationResult::single_head(categories))
    }
}
