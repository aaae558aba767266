//! Persistent CLI settings (JSON file in the user data directory).
//!
//! Command-line flags override whatever is loaded here.

use std::fs;
use std::path::{Path, PathBuf};

use audioclass_core::inference::ScoreOptions;
use audioclass_core::{ClassifyMode, Delegate, OrchestratorConfig, ShortWindowPolicy};
use serde::{Deserialize, Serialize};

/// Window length used by `--stub` runs: 1 s at 16 kHz.
pub const DEFAULT_STUB_WINDOW: usize = 16_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CliSettings {
    pub model_path: Option<String>,
    /// Label map; `None` looks for `class_map.csv` beside the model.
    pub labels_path: Option<String>,
    pub max_results: Option<usize>,
    pub score_threshold: Option<f32>,
    /// `"single"` or `"stream"`.
    pub mode: String,
    /// `"cpu"` or `"accelerator"`.
    pub delegate: String,
    /// `"zero-pad"`, `"reject"` or `"forward"`.
    pub short_window: String,
    pub max_windows: Option<usize>,
    pub conform_format: bool,
    pub stub_window_length: usize,
    pub stub_threshold: f32,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            max_results: None,
            score_threshold: None,
            mode: "stream".into(),
            delegate: "cpu".into(),
            short_window: "zero-pad".into(),
            max_windows: None,
            conform_format: true,
            stub_window_length: DEFAULT_STUB_WINDOW,
            stub_threshold: 0.01,
        }
    }
}

impl CliSettings {
    pub fn normalize(&mut self) {
        self.model_path = self
            .model_path
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.labels_path = self
            .labels_path
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.max_results = self.max_results.filter(|&n| n > 0);
        self.score_threshold = self
            .score_threshold
            .filter(|t| t.is_finite())
            .map(|t| t.clamp(0.0, 1.0));
        self.mode = normalize_mode(&self.mode);
        self.delegate = normalize_delegate(&self.delegate);
        self.short_window = normalize_short_window(&self.short_window);
        self.max_windows = self.max_windows.filter(|&n| n > 0);
        self.stub_window_length = self.stub_window_length.clamp(1, 10 * DEFAULT_STUB_WINDOW);
        self.stub_threshold = self.stub_threshold.clamp(0.0, 1.0);
    }

    pub fn classify_mode(&self) -> ClassifyMode {
        match self.mode.as_str() {
            "single" => ClassifyMode::SingleShot,
            _ => ClassifyMode::FullStream,
        }
    }

    pub fn delegate(&self) -> Delegate {
        Delegate::from_flag(self.delegate == "accelerator")
    }

    pub fn short_window_policy(&self) -> ShortWindowPolicy {
        match self.short_window.as_str() {
            "reject" => ShortWindowPolicy::Reject,
            "forward" => ShortWindowPolicy::Forward,
            _ => ShortWindowPolicy::ZeroPad,
        }
    }

    pub fn score_options(&self) -> ScoreOptions {
        ScoreOptions {
            max_results: self.max_results,
            score_threshold: self.score_threshold,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            short_window: self.short_window_policy(),
            conform_format: self.conform_format,
            max_windows: self.max_windows,
        }
    }
}

pub fn normalize_mode(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "single" | "single-shot" | "single_shot" | "first" => "single".into(),
        _ => "stream".into(),
    }
}

pub fn normalize_delegate(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "accelerator" | "gpu" | "dml" | "directml" | "tpu" => "accelerator".into(),
        _ => "cpu".into(),
    }
}

pub fn normalize_short_window(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "reject" | "strict" => "reject".into(),
        "forward" | "pass" | "as-is" => "forward".into(),
        _ => "zero-pad".into(),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audioclass")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("audioclass")
            .join("settings.json")
    }
}

/// Missing or malformed files yield defaults.
pub fn load_settings(path: &Path) -> CliSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<CliSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &CliSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
