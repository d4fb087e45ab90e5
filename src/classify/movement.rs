//! Movement classification over a window of frames.
//!
//! Separates whole-hand motion (dynamic gestures) from a hand holding a
//! sign (static) and from tracking jitter (noise). Metrics are computed on
//! the first detected hand of each frame.

use tracing::debug;

use super::window::{ClassificationWindow, DEFAULT_WINDOW_SIZE};
use crate::hand::{FrameSample, HandLandmark};

/// Movement category for a full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementClass {
    Noise,
    Static,
    Dynamic,
}

impl MovementClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Thresholds for movement classification.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Frames per classification window.
    pub window_size: usize,
    /// Wrist to middle-MCP distance below which the hand is too small to judge.
    pub min_hand_scale: f32,
    /// Scale-relative path length above which the window is dynamic.
    pub dynamic_translation: f32,
    /// Fingertip variance above which a still hand is treated as jitter.
    pub wiggle_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            min_hand_scale: 0.01,
            dynamic_translation: 0.9,
            wiggle_threshold: 0.0008,
        }
    }
}

/// Raw metrics behind a classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementMetrics {
    pub hand_scale: f32,
    pub hand_translation: f32,
    pub finger_wiggle: f32,
}

/// Path length of one landmark across the window, skipping any step where
/// either frame has no hand.
fn path_length(window: &ClassificationWindow, landmark: HandLandmark) -> f32 {
    let frames: Vec<&FrameSample> = window.iter().collect();
    frames
        .windows(2)
        .filter_map(|pair| match (pair[0].first(), pair[1].first()) {
            (Some(a), Some(b)) => Some(a.point(landmark).distance(&b.point(landmark))),
            _ => None,
        })
        .sum()
}

/// Per-frame fingertip-to-wrist variance, averaged over the window length.
fn finger_wiggle(window: &ClassificationWindow) -> f32 {
    let series: Vec<[f32; 4]> = window
        .iter()
        .filter_map(FrameSample::first)
        .map(|hand| HandLandmark::fingertips().map(|tip| hand.distance(tip, HandLandmark::Wrist)))
        .collect();
    if series.is_empty() {
        return 0.0;
    }

    let mut means = [0.0_f32; 4];
    for sample in &series {
        for (mean, d) in means.iter_mut().zip(sample) {
            *mean += d;
        }
    }
    for mean in means.iter_mut() {
        *mean /= series.len() as f32;
    }

    let sum_sq: f32 = series
        .iter()
        .map(|sample| {
            sample
                .iter()
                .zip(&means)
                .map(|(d, mean)| (d - mean).powi(2))
                .sum::<f32>()
        })
        .sum();
    sum_sq / window.len() as f32
}

/// Compute movement metrics. `None` when the latest frame has no hand.
pub fn movement_metrics(window: &ClassificationWindow) -> Option<MovementMetrics> {
    let latest = window.latest()?.first()?;
    let hand_scale = latest.scale();
    let wrist = path_length(window, HandLandmark::Wrist);
    let middle = path_length(window, HandLandmark::MiddleMcp);
    let hand_translation = if hand_scale > 0.0 {
        (wrist + middle) / 2.0 / hand_scale
    } else {
        0.0
    };
    Some(MovementMetrics {
        hand_scale,
        hand_translation,
        finger_wiggle: finger_wiggle(window),
    })
}

/// Window classifier. Remembers its last decision for the predictor.
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    pub config: ClassifierConfig,
    last_classification: Option<MovementClass>,
    last_metrics: Option<MovementMetrics>,
}

impl MovementClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            last_classification: None,
            last_metrics: None,
        }
    }

    /// Classify the window. Anything short of a full window with a
    /// measurable hand is noise.
    pub fn classify(&mut self, window: &ClassificationWindow) -> MovementClass {
        let (class, metrics) = self.evaluate(window);
        self.last_classification = Some(class);
        self.last_metrics = metrics;
        class
    }

    fn evaluate(&self, window: &ClassificationWindow) -> (MovementClass, Option<MovementMetrics>) {
        if !window.is_full() {
            return (MovementClass::Noise, None);
        }
        let Some(metrics) = movement_metrics(window) else {
            return (MovementClass::Noise, None);
        };
        if metrics.hand_scale < self.config.min_hand_scale {
            debug!(scale = metrics.hand_scale, "hand too small to classify");
            return (MovementClass::Noise, Some(metrics));
        }

        let class = if metrics.hand_translation > self.config.dynamic_translation {
            MovementClass::Dynamic
        } else if metrics.finger_wiggle > self.config.wiggle_threshold {
            MovementClass::Noise
        } else {
            MovementClass::Static
        };
        debug!(
            "Movement {}: translation={:.3} wiggle={:.5}",
            class.as_str(),
            metrics.hand_translation,
            metrics.finger_wiggle,
        );
        (class, Some(metrics))
    }

    pub fn last_classification(&self) -> Option<MovementClass> {
        self.last_classification
    }

    pub fn last_metrics(&self) -> Option<MovementMetrics> {
        self.last_metrics
    }

    pub fn reset(&mut self) {
        self.last_classification = None;
        self.last_metrics = None;
    }
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::hand_at;
    use super::*;

    fn full_window<F>(mut frame_at: F) -> ClassificationWindow
    where
        F: FnMut(usize) -> FrameSample,
    {
        let mut window = ClassificationWindow::new(DEFAULT_WINDOW_SIZE);
        for i in 0..DEFAULT_WINDOW_SIZE {
            window.push(frame_at(i));
        }
        window
    }

    #[test]
    fn test_partial_window_is_noise() {
        let mut classifier = MovementClassifier::default();
        let mut window = ClassificationWindow::new(DEFAULT_WINDOW_SIZE);
        for _ in 0..DEFAULT_WINDOW_SIZE - 1 {
            window.push(FrameSample::OneHand(hand_at(0.5, 0.8, 0.33)));
        }
        assert_eq!(classifier.classify(&window), MovementClass::Noise);
        assert_eq!(classifier.last_classification(), Some(MovementClass::Noise));
    }

    #[test]
    fn test_still_hand_is_static() {
        let mut classifier = MovementClassifier::default();
        // Fingertip distances oscillate by less than 0.01 around their mean.
        let window = full_window(|i| {
            let jitter = if i % 2 == 0 { 0.004 } else { -0.004 };
            FrameSample::OneHand(hand_at(0.5, 0.8, 0.33 + jitter))
        });
        let metrics = movement_metrics(&window).unwrap();
        assert!((metrics.hand_scale - 0.15).abs() < 1e-4);
        assert!(metrics.hand_translation < 1e-4);
        assert!(metrics.finger_wiggle < 0.0008, "wiggle {}", metrics.finger_wiggle);
        assert_eq!(classifier.classify(&window), MovementClass::Static);
    }

    #[test]
    fn test_moving_hand_is_dynamic() {
        let mut classifier = MovementClassifier::default();
        // Wrist travels linearly from (0.1, 0.1) to (0.9, 0.9).
        let window = full_window(|i| {
            let t = i as f32 / (DEFAULT_WINDOW_SIZE - 1) as f32;
            let pos = 0.1 + 0.8 * t;
            FrameSample::OneHand(hand_at(pos, pos, 0.33))
        });
        let metrics = movement_metrics(&window).unwrap();
        assert!((metrics.hand_scale - 0.15).abs() < 1e-4);
        assert!(metrics.hand_translation > 0.9, "translation {}", metrics.hand_translation);
        assert_eq!(classifier.classify(&window), MovementClass::Dynamic);
        assert_eq!(classifier.last_classification(), Some(MovementClass::Dynamic));
    }

    #[test]
    fn test_jittery_fingers_are_noise() {
        let mut classifier = MovementClassifier::default();
        let window = full_window(|i| {
            let jitter = if i % 2 == 0 { 0.03 } else { -0.03 };
            FrameSample::OneHand(hand_at(0.5, 0.8, 0.33 + jitter))
        });
        assert_eq!(classifier.classify(&window), MovementClass::Noise);
    }

    #[test]
    fn test_tiny_hand_is_noise() {
        let mut classifier = MovementClassifier::default();
        classifier.config.min_hand_scale = 0.2;
        let window = full_window(|_| FrameSample::OneHand(hand_at(0.5, 0.8, 0.33)));
        assert_eq!(classifier.classify(&window), MovementClass::Noise);
    }

    #[test]
    fn test_latest_without_hand_is_noise() {
        let mut classifier = MovementClassifier::default();
        let window = full_window(|i| {
            if i == DEFAULT_WINDOW_SIZE - 1 {
                FrameSample::NoHand
            } else {
                FrameSample::OneHand(hand_at(0.5, 0.8, 0.33))
            }
        });
        assert_eq!(classifier.classify(&window), MovementClass::Noise);
        assert!(classifier.last_metrics().is_none());
    }

    #[test]
    fn test_translation_skips_missing_frames() {
        // Hand jumps across the frame while undetected; the gap is not counted.
        let window = full_window(|i| match i {
            0..=9 => FrameSample::OneHand(hand_at(0.2, 0.8, 0.33)),
            10 => FrameSample::NoHand,
            _ => FrameSample::OneHand(hand_at(0.8, 0.8, 0.33)),
        });
        let metrics = movement_metrics(&window).unwrap();
        assert!(metrics.hand_translation < 1e-4, "translation {}", metrics.hand_translation);
    }

    #[test]
    fn test_reset_clears_last() {
        let mut classifier = MovementClassifier::default();
        let window = full_window(|_| FrameSample::OneHand(hand_at(0.5, 0.8, 0.33)));
        classifier.classify(&window);
        assert!(classifier.last_classification().is_some());
        classifier.reset();
        assert!(classifier.last_classification().is_none());
        assert!(classifier.last_metrics().is_none());
    }

    #[test]
    fn test_movement_class_as_str() {
        assert_eq!(MovementClass::Noise.as_str(), "noise");
        assert_eq!(MovementClass::Static.as_str(), "static");
        assert_eq!(MovementClass::Dynamic.as_str(), "dynamic");
    }
}
