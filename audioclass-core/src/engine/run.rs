//! Per-invocation orchestration record and result aggregation.

use std::time::Duration;

use crate::{
    audio::AudioFormat,
    buffering::window::{offset_secs, ClassifyMode},
    error::{AudioClassError, Result},
    inference::{ClassificationResult, Delegate},
    report::{RunReport, WindowReport},
};

/// One classified window.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedWindow {
    pub index: usize,
    /// Sample offset of the window in the (conformed) source.
    pub offset: usize,
    /// Real samples in the window, before any padding.
    pub len: usize,
    pub result: ClassificationResult,
}

/// Everything one `classify_single` / `classify_stream` call produced.
#[derive(Debug, Clone)]
pub struct ClassificationRun {
    /// Human-readable description of the input.
    pub input: String,
    pub mode: ClassifyMode,
    /// Format the windows were cut in.
    pub format: AudioFormat,
    pub window_length: usize,
    /// Windows the input segments into (before any mode or budget limit).
    pub windows_total: usize,
    /// Classified windows in ascending offset order.
    pub windows: Vec<ClassifiedWindow>,
    /// Wall-clock time spent inside classifier calls only.
    pub elapsed: Duration,
    /// Observability only.
    pub delegate: Delegate,
}

impl ClassificationRun {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Per-window results in order.
    pub fn results(&self) -> impl Iterator<Item = &ClassificationResult> + '_ {
        self.windows.iter().map(|w| &w.result)
    }

    /// First window's result (the answer in single-shot mode).
    pub fn first_result(&self) -> Option<&ClassificationResult> {
        self.windows.first().map(|w| &w.result)
    }

    /// `true` when fewer windows were classified than the input holds.
    pub fn is_truncated(&self) -> bool {
        self.windows.len() < self.windows_total
    }

    /// Top label of every classified window, in order.
    pub fn top_labels(&self) -> Result<Vec<String>> {
        self.windows
            .iter()
            .map(|w| {
                w.result
                    .top_label()
                    .map(str::to_owned)
                    .ok_or_else(|| empty_result(w.index))
            })
            .collect()
    }

    /// Top label of the first window.
    ///
    /// # Errors
    /// `Classify` when the run classified nothing.
    pub fn top_label(&self) -> Result<String> {
        let first = self
            .windows
            .first()
            .ok_or_else(|| AudioClassError::Classify("run produced no results".into()))?;
        first
            .result
            .top_label()
            .map(str::to_owned)
            .ok_or_else(|| empty_result(first.index))
    }

    /// Serializable summary.
    pub fn report(&self) -> RunReport {
        RunReport {
            input: self.input.clone(),
            mode: self.mode,
            delegate: self.delegate.label().to_string(),
            elapsed_ms: self.elapsed.as_secs_f64() * 1_000.0,
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
            window_length: self.window_length,
            windows_total: self.windows_total,
            windows: self
                .windows
                .iter()
                .map(|w| {
                    let top = w.result.top_category();
                    WindowReport {
                        index: w.index,
                        start_secs: offset_secs(w.offset, self.format),
                        samples: w.len,
                        label: top.map(|c| c.label.clone()).unwrap_or_default(),
                        score: top.map(|c| c.score).unwrap_or(0.0),
                        result: w.result.clone(),
                    }
                })
                .collect(),
        }
    }
}

fn empty_result(index: usize) -> AudioClassError {
    AudioClassError::Classify(format!("window {index} has no categories"))
}
