//! Gesture prediction: window classification routed to the static or
//! dynamic model.

use std::collections::VecDeque;

use anyhow::Context;
use tracing::debug;

use super::model::{ModelKind, ModelStore};
use super::movement::{ClassifierConfig, MovementClass, MovementClassifier};
use super::window::ClassificationWindow;
use crate::hand::{encode_frame, encode_sequence, FrameSample};
use crate::sexp::{bool_atom, escape_string};

/// Label shown while no hand is in view.
pub const NO_HAND_LABEL: &str = "no hand";

/// Label for a window classified as noise.
pub const NOISE_LABEL: &str = "noise";

/// Label shown while a model is missing.
pub const UNAVAILABLE_LABEL: &str = "not ready";

/// Default number of distinct labels kept in the prediction log.
pub const MAX_LOG_ENTRIES: usize = 20;

/// Outcome of one prediction. Inference failures are reported through
/// `Err` on [`GesturePredictor::predict`], never as a variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// A model produced this label.
    Gesture(String),
    /// The window did not contain a usable gesture; no model was queried.
    Noise,
    /// A model is not loaded.
    Unavailable,
}

impl Prediction {
    pub fn label(&self) -> &str {
        match self {
            Self::Gesture(label) => label,
            Self::Noise => NOISE_LABEL,
            Self::Unavailable => UNAVAILABLE_LABEL,
        }
    }
}

/// Prediction cadence and log size.
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Frames between predictions once the window is full.
    pub predict_every_frames: u32,
    /// Distinct labels kept in the log.
    pub max_log_entries: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            predict_every_frames: 15,
            max_log_entries: MAX_LOG_ENTRIES,
        }
    }
}

// ── Predictor ──────────────────────────────────────────────

/// Owns the classification window, the movement classifier and the models.
pub struct GesturePredictor {
    pub config: PredictorConfig,
    window: ClassificationWindow,
    classifier: MovementClassifier,
    models: ModelStore,
    frames_since_prediction: u32,
}

impl GesturePredictor {
    pub fn new(config: PredictorConfig, classifier: ClassifierConfig, models: ModelStore) -> Self {
        Self {
            config,
            window: ClassificationWindow::new(classifier.window_size),
            classifier: MovementClassifier::new(classifier),
            models,
            frames_since_prediction: 0,
        }
    }

    /// Append a frame to the window.
    pub fn push(&mut self, frame: FrameSample) {
        self.window.push(frame);
        self.frames_since_prediction = self.frames_since_prediction.saturating_add(1);
    }

    /// Append a frame and predict if the window is full and a prediction is due.
    pub fn observe(&mut self, frame: FrameSample) -> Option<anyhow::Result<Prediction>> {
        self.push(frame);
        if !self.window.is_full()
            || self.frames_since_prediction < self.config.predict_every_frames.max(1)
        {
            return None;
        }
        self.frames_since_prediction = 0;
        Some(self.predict())
    }

    /// Predict a gesture from the current window.
    pub fn predict(&mut self) -> anyhow::Result<Prediction> {
        if !self.models.is_ready() {
            return Ok(Prediction::Unavailable);
        }

        match self.classifier.classify(&self.window) {
            MovementClass::Noise => Ok(Prediction::Noise),
            MovementClass::Static => {
                let Some(latest) = self.window.latest() else {
                    return Ok(Prediction::Noise);
                };
                let features = encode_frame(latest);
                self.query(ModelKind::Static, features.as_slice())
            }
            MovementClass::Dynamic => {
                let features = encode_sequence(self.window.iter());
                self.query(ModelKind::Dynamic, &features)
            }
        }
    }

    fn query(&self, kind: ModelKind, features: &[f32]) -> anyhow::Result<Prediction> {
        let Some(model) = self.models.get(kind) else {
            return Ok(Prediction::Unavailable);
        };
        let label = model
            .predict(features)
            .with_context(|| format!("{} model inference failed", kind.as_str()))?;
        debug!(model = kind.as_str(), label = %label, "prediction");
        Ok(Prediction::Gesture(label))
    }

    pub fn window(&self) -> &ClassificationWindow {
        &self.window
    }

    pub fn last_classification(&self) -> Option<MovementClass> {
        self.classifier.last_classification()
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_ready()
    }

    /// Drop all window and classification state. Models stay loaded.
    pub fn reset(&mut self) {
        self.window.clear();
        self.classifier.reset();
        self.frames_since_prediction = 0;
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:static-model {} :dynamic-model {} :window {} :window-size {} :last-movement {})",
            bool_atom(self.models.is_loaded(ModelKind::Static)),
            bool_atom(self.models.is_loaded(ModelKind::Dynamic)),
            self.window.len(),
            self.window.capacity(),
            self.classifier
                .last_classification()
                .map(|c| format!(":{}", c.as_str()))
                .unwrap_or_else(|| "nil".to_string()),
        )
    }
}

// ── Prediction log ─────────────────────────────────────────

/// Current label plus the most recent distinct labels, newest first.
#[derive(Debug, Clone)]
pub struct PredictionLog {
    entries: VecDeque<String>,
    current: Option<String>,
    last_logged: Option<String>,
    max_entries: usize,
}

impl PredictionLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            current: None,
            last_logged: None,
            max_entries,
        }
    }

    /// Record a label. Returns true if it was added to the log.
    pub fn record(&mut self, label: &str) -> bool {
        self.current = Some(label.to_string());
        if self.last_logged.as_deref() == Some(label) {
            return false;
        }
        self.entries.push_front(label.to_string());
        self.entries.truncate(self.max_entries);
        self.last_logged = Some(label.to_string());
        true
    }

    /// No hand in view: show it, and log the next label even if it repeats.
    pub fn no_hand(&mut self) {
        self.current = Some(NO_HAND_LABEL.to_string());
        self.last_logged = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Logged labels, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
        self.last_logged = None;
    }

    /// Generate s-expression of the log.
    pub fn log_sexp(&self) -> String {
        let entries: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("\"{}\"", escape_string(e)))
            .collect();
        format!(
            "(:current {} :log ({}))",
            self.current
                .as_deref()
                .map(|c| format!("\"{}\"", escape_string(c)))
                .unwrap_or_else(|| "nil".to_string()),
            entries.join(" "),
        )
    }
}

impl Default for PredictionLog {
    fn default() -> Self {
        Self::new(MAX_LOG_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::classify::model::{GestureModel, NearestCentroidModel};
    use crate::classify::movement::test_support::hand_at;
    use crate::classify::window::DEFAULT_WINDOW_SIZE;
    use crate::hand::FRAME_FEATURES;

    struct CountingModel {
        label: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl GestureModel for CountingModel {
        fn predict(&self, _features: &[f32]) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.label.to_string())
        }
    }

    struct FailingModel;

    impl GestureModel for FailingModel {
        fn predict(&self, _features: &[f32]) -> anyhow::Result<String> {
            anyhow::bail!("backend crashed")
        }
    }

    fn still_frame(i: usize) -> FrameSample {
        let jitter = if i % 2 == 0 { 0.002 } else { -0.002 };
        FrameSample::OneHand(hand_at(0.5, 0.8, 0.33 + jitter))
    }

    fn moving_frame(i: usize) -> FrameSample {
        let pos = 0.1 + 0.8 * i as f32 / (DEFAULT_WINDOW_SIZE - 1) as f32;
        FrameSample::OneHand(hand_at(pos, pos, 0.33))
    }

    fn jitter_frame(i: usize) -> FrameSample {
        let jitter = if i % 2 == 0 { 0.03 } else { -0.03 };
        FrameSample::OneHand(hand_at(0.5, 0.8, 0.33 + jitter))
    }

    fn centroid_store() -> ModelStore {
        let open = encode_frame(&FrameSample::OneHand(hand_at(0.5, 0.8, 0.33)));
        let static_model = NearestCentroidModel::new(
            FRAME_FEATURES,
            vec![
                ("open".to_string(), open.as_slice().to_vec()),
                ("empty".to_string(), vec![0.0; FRAME_FEATURES]),
            ],
        )
        .unwrap();

        let moving: Vec<FrameSample> = (0..DEFAULT_WINDOW_SIZE).map(moving_frame).collect();
        let dynamic_model = NearestCentroidModel::new(
            FRAME_FEATURES * DEFAULT_WINDOW_SIZE,
            vec![
                ("swipe".to_string(), encode_sequence(moving.iter())),
                ("empty".to_string(), vec![0.0; FRAME_FEATURES * DEFAULT_WINDOW_SIZE]),
            ],
        )
        .unwrap();
        ModelStore::new(Some(Box::new(static_model)), Some(Box::new(dynamic_model)))
    }

    fn predictor_with(models: ModelStore) -> GesturePredictor {
        GesturePredictor::new(PredictorConfig::default(), ClassifierConfig::default(), models)
    }

    fn fill(predictor: &mut GesturePredictor, frame_at: fn(usize) -> FrameSample) {
        for i in 0..DEFAULT_WINDOW_SIZE {
            predictor.push(frame_at(i));
        }
    }

    #[test]
    fn test_static_window_queries_static_model() {
        let mut predictor = predictor_with(centroid_store());
        fill(&mut predictor, still_frame);
        let prediction = predictor.predict().unwrap();
        assert_eq!(prediction, Prediction::Gesture("open".to_string()));
        assert_eq!(predictor.last_classification(), Some(MovementClass::Static));
    }

    #[test]
    fn test_dynamic_window_queries_dynamic_model() {
        let mut predictor = predictor_with(centroid_store());
        fill(&mut predictor, moving_frame);
        let prediction = predictor.predict().unwrap();
        assert_eq!(prediction, Prediction::Gesture("swipe".to_string()));
        assert_eq!(predictor.last_classification(), Some(MovementClass::Dynamic));
    }

    #[test]
    fn test_noise_skips_models() {
        let calls = Arc::new(AtomicUsize::new(0));
        let models = ModelStore::new(
            Some(Box::new(CountingModel { label: "a", calls: calls.clone() })),
            Some(Box::new(CountingModel { label: "b", calls: calls.clone() })),
        );
        let mut predictor = predictor_with(models);
        fill(&mut predictor, jitter_frame);
        let prediction = predictor.predict().unwrap();
        assert_eq!(prediction, Prediction::Noise);
        assert_eq!(prediction.label(), "noise");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_partial_window_is_noise() {
        let mut predictor = predictor_with(centroid_store());
        predictor.push(still_frame(0));
        assert_eq!(predictor.predict().unwrap(), Prediction::Noise);
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let models = ModelStore::new(
            Some(Box::new(CountingModel { label: "a", calls: calls.clone() })),
            None,
        );
        let mut predictor = predictor_with(models);
        fill(&mut predictor, still_frame);
        assert!(!predictor.is_ready());
        assert_eq!(predictor.predict().unwrap(), Prediction::Unavailable);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_inference_failure_is_error() {
        let models = ModelStore::new(Some(Box::new(FailingModel)), Some(Box::new(FailingModel)));
        let mut predictor = predictor_with(models);
        fill(&mut predictor, still_frame);
        let err = predictor.predict().unwrap_err();
        assert!(format!("{err:#}").contains("backend crashed"), "got {err:#}");
    }

    #[test]
    fn test_observe_cadence() {
        let calls = Arc::new(AtomicUsize::new(0));
        let models = ModelStore::new(
            Some(Box::new(CountingModel { label: "a", calls: calls.clone() })),
            Some(Box::new(CountingModel { label: "b", calls: calls.clone() })),
        );
        let mut predictor = predictor_with(models);
        let every = predictor.config.predict_every_frames as usize;

        let mut predictions = 0;
        for i in 0..DEFAULT_WINDOW_SIZE + every {
            if predictor.observe(still_frame(i)).is_some() {
                predictions += 1;
            }
        }
        // One when the window fills, one after another full cadence.
        assert_eq!(predictions, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reset_empties_window() {
        let mut predictor = predictor_with(centroid_store());
        fill(&mut predictor, still_frame);
        predictor.predict().unwrap();
        predictor.reset();
        assert!(predictor.window().is_empty());
        assert!(predictor.last_classification().is_none());
        assert!(predictor.is_ready(), "models survive reset");
    }

    #[test]
    fn test_status_sexp() {
        let predictor = predictor_with(ModelStore::default());
        let sexp = predictor.status_sexp();
        assert!(sexp.contains(":static-model nil"));
        assert!(sexp.contains(":window-size 20"));
        assert!(sexp.contains(":last-movement nil"));
        assert!(lexpr::from_str(&sexp).is_ok());
    }

    #[test]
    fn test_log_keeps_distinct_labels() {
        let mut log = PredictionLog::default();
        assert!(log.record("fist"));
        assert!(!log.record("fist"));
        assert!(log.record("open"));
        assert_eq!(log.entries().collect::<Vec<_>>(), vec!["open", "fist"]);
        assert_eq!(log.current(), Some("open"));
    }

    #[test]
    fn test_log_no_hand_allows_repeat() {
        let mut log = PredictionLog::default();
        log.record("fist");
        log.no_hand();
        assert_eq!(log.current(), Some(NO_HAND_LABEL));
        assert!(log.record("fist"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_log_bounded() {
        let mut log = PredictionLog::new(3);
        for label in ["a", "b", "c", "d", "e"] {
            log.record(label);
        }
        assert_eq!(log.entries().collect::<Vec<_>>(), vec!["e", "d", "c"]);
        log.clear();
        assert!(log.is_empty());
        assert!(log.current().is_none());
    }

    #[test]
    fn test_log_sexp() {
        let mut log = PredictionLog::default();
        log.record("thumbs \"up\"");
        let sexp = log.log_sexp();
        assert!(lexpr::from_str(&sexp).is_ok(), "invalid sexp: {sexp}");
        assert!(sexp.contains(":current \"thumbs \\\"up\\\"\""));
    }
}
