pub mod model;
pub mod movement;
pub mod predictor;
pub mod window;

pub use model::{GestureModel, ModelKind, ModelStore, NearestCentroidModel};
pub use movement::{movement_metrics, ClassifierConfig, MovementClass, MovementClassifier, MovementMetrics};
pub use predictor::{
    GesturePredictor, Prediction, PredictionLog, PredictorConfig, MAX_LOG_ENTRIES, NO_HAND_LABEL,
    NOISE_LABEL, UNAVAILABLE_LABEL,
};
pub use window::{ClassificationWindow, DEFAULT_WINDOW_SIZE, VIDEO_WINDOW_SIZE};
