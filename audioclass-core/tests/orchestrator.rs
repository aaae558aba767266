use std::sync::Arc;

use audioclass_core::inference::stub::{StubClassifier, SILENCE_LABEL};
use audioclass_core::inference::{Category, ClassificationResult};
use audioclass_core::{
    AudioClassError, AudioClassifier, AudioFormat, AudioSamples, AudioSource, ClassifierHandle,
    ClassifyMode, Orchestrator, OrchestratorConfig, ShortWindowPolicy, Window,
};
use parking_lot::Mutex;

const W: usize = 400;

/// Always answers with one fixed label and records window lengths.
struct FixedLabel {
    label: &'static str,
    lengths: Arc<Mutex<Vec<usize>>>,
}

impl AudioClassifier for FixedLabel {
    fn required_input_len(&self) -> usize {
        W
    }

    fn classify(
        &mut self,
        window: &Window<'_>,
    ) -> std::result::Result<ClassificationResult, AudioClassError> {
        self.lengths.lock().push(window.len());
        Ok(ClassificationResult::single_head(vec![Category::new(
            0, 0.9, self.label,
        )]))
    }
}

/// Returns a result with no categories.
struct EmptyHead;

impl AudioClassifier for EmptyHead {
    fn required_input_len(&self) -> usize {
        W
    }

    fn classify(
        &mut self,
        _window: &Window<'_>,
    ) -> std::result::Result<ClassificationResult, AudioClassError> {
        Ok(ClassificationResult::single_head(Vec::new()))
    }
}

fn fixed(label: &'static str) -> (ClassifierHandle, Arc<Mutex<Vec<usize>>>) {
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let handle = ClassifierHandle::new(FixedLabel {
        label,
        lengths: Arc::clone(&lengths),
    });
    (handle, lengths)
}

fn samples(n: usize, value: f32) -> AudioSource {
    AudioSource::Samples(AudioSamples::new(vec![value; n], AudioFormat::default()).unwrap())
}

#[test]
fn full_stream_classifies_every_window() {
    let (handle, lengths) = fixed("dog");
    let run = Orchestrator::default()
        .classify_stream(&handle, &samples(3 * W, 0.2))
        .unwrap();
    assert_eq!(run.mode, ClassifyMode::FullStream);
    assert_eq!(run.top_labels().unwrap(), vec!["dog", "dog", "dog"]);
    assert_eq!(lengths.lock().len(), 3);
}

#[test]
fn single_shot_classifies_one_window() {
    let (handle, lengths) = fixed("dog");
    let run = Orchestrator::default()
        .classify_single(&handle, &samples(3 * W, 0.2))
        .unwrap();
    assert_eq!(run.len(), 1);
    assert_eq!(run.top_label().unwrap(), "dog");
    assert_eq!(*lengths.lock(), vec![W]);
}

#[test]
fn full_stream_visits_windows_in_offset_order() {
    let stub = StubClassifier::new(W);
    let seen = stub.seen_offsets();
    let handle = ClassifierHandle::new(stub);
    let run = Orchestrator::default()
        .classify_stream(&handle, &samples(3 * W + 10, 0.3))
        .unwrap();

    assert_eq!(*seen.lock(), vec![0, W, 2 * W, 3 * W]);
    let offsets: Vec<_> = run.windows.iter().map(|w| w.offset).collect();
    assert_eq!(offsets, vec![0, W, 2 * W, 3 * W]);
    assert_eq!(run.windows[3].len, 10);
}

#[test]
fn short_windows_are_zero_padded_by_default() {
    let (handle, lengths) = fixed("dog");
    Orchestrator::default()
        .classify_stream(&handle, &samples(W + 1, 0.2))
        .unwrap();
    assert_eq!(*lengths.lock(), vec![W, W]);
}

#[test]
fn single_shot_pads_input_shorter_than_one_window() {
    let (handle, lengths) = fixed("dog");
    let run = Orchestrator::default()
        .classify_single(&handle, &samples(10, 0.2))
        .unwrap();
    assert_eq!(*lengths.lock(), vec![W]);
    assert_eq!(run.len(), 1);
    assert_eq!(run.windows[0].len, 10);
    assert_eq!(run.windows[0].offset, 0);
}

#[test]
fn single_shot_rejects_short_input_when_configured() {
    let (handle, lengths) = fixed("dog");
    let orchestrator = Orchestrator::new(OrchestratorConfig {
        short_window: ShortWindowPolicy::Reject,
        ..OrchestratorConfig::default()
    });
    let err = orchestrator
        .classify_single(&handle, &samples(10, 0.2))
        .unwrap_err();
    assert_eq!(err.window_index(), Some(0));
    assert!(matches!(err.root(), AudioClassError::InvalidArgument(_)));
    assert!(lengths.lock().is_empty());
}

#[test]
fn failure_stops_the_stream_at_that_window() {
    let stub = StubClassifier::new(W).failing_on(2);
    let seen = stub.seen_offsets();
    let handle = ClassifierHandle::new(stub);

    let err = Orchestrator::default()
        .classify_stream(&handle, &samples(5 * W, 0.3))
        .unwrap_err();

    assert_eq!(err.window_index(), Some(2));
    assert!(matches!(err.root(), AudioClassError::Classify(_)));
    assert!(err.to_string().contains("full-stream"));
    assert_eq!(seen.lock().len(), 3);
}

#[test]
fn empty_input_in_full_stream_is_an_empty_run() {
    let stub = StubClassifier::new(W);
    let seen = stub.seen_offsets();
    let handle = ClassifierHandle::new(stub);

    let run = Orchestrator::default()
        .classify_stream(&handle, &samples(0, 0.0))
        .unwrap();
    assert!(run.is_empty());
    assert!(run.top_labels().unwrap().is_empty());
    assert!(seen.lock().is_empty());
}

#[test]
fn empty_input_in_single_shot_is_invalid() {
    let (handle, lengths) = fixed("dog");
    let err = Orchestrator::default()
        .classify_single(&handle, &samples(0, 0.0))
        .unwrap_err();
    assert!(matches!(err, AudioClassError::InvalidArgument(_)));
    assert!(lengths.lock().is_empty());
}

#[test]
fn empty_classifier_output_is_an_error() {
    let handle = ClassifierHandle::new(EmptyHead);
    let err = Orchestrator::default()
        .classify_stream(&handle, &samples(W, 0.1))
        .unwrap_err();
    assert_eq!(err.window_index(), Some(0));
    assert!(matches!(err.root(), AudioClassError::Classify(_)));
}

#[test]
fn silence_and_sound_are_told_apart() {
    let mut data = vec![0.0_f32; W];
    data.extend(std::iter::repeat(0.4).take(W));
    let source = AudioSource::Samples(AudioSamples::new(data, AudioFormat::default()).unwrap());
    let handle = ClassifierHandle::new(StubClassifier::new(W).with_sound_label("speech"));

    let run = Orchestrator::default().classify_stream(&handle, &source).unwrap();
    assert_eq!(run.top_labels().unwrap(), vec![SILENCE_LABEL, "speech"]);

    let report = run.report();
    assert_eq!(report.labels(), vec![SILENCE_LABEL, "speech"]);
    assert_eq!(report.windows_total, 2);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "full-stream");
    assert_eq!(json["windows"][1]["label"], "speech");
}

#[test]
fn shared_handle_serves_both_modes() {
    let (handle, lengths) = fixed("rain");
    let orchestrator = Orchestrator::default();
    let source = samples(2 * W, 0.2);

    let single = orchestrator.classify(&handle, &source, ClassifyMode::SingleShot).unwrap();
    let stream = orchestrator.classify(&handle, &source, ClassifyMode::FullStream).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(stream.len(), 2);
    assert_eq!(lengths.lock().len(), 3);
}
