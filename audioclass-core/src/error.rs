use thiserror::Error;

use crate::buffering::window::ClassifyMode;

/// All errors produced by audioclass-core.
#[derive(Debug, Error)]
pub enum AudioClassError {
    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("classification error: {0}")]
    Classify(String),

    #[error("model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("ONNX session error: {0}")]
    OnnxSession(String),

    /// Orchestrator context: which window failed, and in which mode.
    #[error("{mode} classification failed at window {index}")]
    Window {
        mode: ClassifyMode,
        index: usize,
        #[source]
        source: Box<AudioClassError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AudioClassError {
    /// Wrap `self` with the window index and mode it occurred in.
    pub fn at_window(self, mode: ClassifyMode, index: usize) -> Self {
        Self::Window {
            mode,
            index,
            source: Box::new(self),
        }
    }

    /// The underlying error with any orchestrator context stripped.
    pub fn root(&self) -> &AudioClassError {
        match self {
            Self::Window { source, .. } => source.root(),
            other => other,
        }
    }

    /// Index of the failing window, if the error carries orchestrator context.
    pub fn window_index(&self) -> Option<usize> {
        match self {
            Self::Window { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AudioClassError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_context_exposes_root_and_index() {
        let err = AudioClassError::Classify("engine refused input".into())
            .at_window(ClassifyMode::FullStream, 4);

        assert_eq!(err.window_index(), Some(4));
        assert!(matches!(err.root(), AudioClassError::Classify(_)));
        assert_eq!(
            err.to_string(),
            "full-stream classification failed at window 4"
        );
    }

    #[test]
    fn window_context_names_the_cause_once() {
        use std::error::Error as _;

        let err = AudioClassError::Classify("engine refused input".into())
            .at_window(ClassifyMode::SingleShot, 0);
        let cause = err.source().map(ToString::to_string);
        assert_eq!(
            cause.as_deref(),
            Some("classification error: engine refused input")
        );
        assert!(!err.to_string().contains("engine refused input"));
    }

    #[test]
    fn plain_errors_have_no_window() {
        let err = AudioClassError::Decode("not a RIFF file".into());
        assert_eq!(err.window_index(), None);
        assert!(matches!(err.root(), AudioClassError::Decode(_)));
    }
}
