//! Serializable run summaries.
//!
//! `RunReport` is what the CLI prints with `--json`; field names are
//! camelCase to match the rest of the JSON surface.

use serde::{Deserialize, Serialize};

use crate::buffering::window::ClassifyMode;
use crate::inference::ClassificationResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub input: String,
    pub mode: ClassifyMode,
    /// `"CPU"` or `"Accelerator"`.
    pub delegate: String,
    pub elapsed_ms: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub window_length: usize,
    pub windows_total: usize,
    pub windows: Vec<WindowReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowReport {
    pub index: usize,
    pub start_secs: f64,
    /// Real samples in the window, before padding.
    pub samples: usize,
    /// Top label of the first head.
    pub label: String,
    pub score: f32,
    pub result: ClassificationResult,
}

impl RunReport {
    /// Top labels in window order.
    pub fn labels(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.label.as_str()).collect()
    }
}
