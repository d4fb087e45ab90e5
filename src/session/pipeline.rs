//! Consumer side of a session: one frame in, actions and predictions out.

use tracing::{debug, warn};

use crate::classify::{GesturePredictor, ModelStore, Prediction, PredictionLog};
use crate::command::{Action, ActionExecutor, CommandMapper};
use crate::config::InterpreterConfig;
use crate::hand::FrameSample;

/// What one frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub actions: Vec<Action>,
    /// Set on frames where a prediction was due and succeeded.
    pub prediction: Option<Prediction>,
}

/// Feeds every frame to the command mapper and the classification path.
pub struct Pipeline {
    mapper: CommandMapper,
    predictor: GesturePredictor,
    executor: Box<dyn ActionExecutor>,
    log: PredictionLog,
    frames: u64,
    inference_errors: u64,
}

impl Pipeline {
    pub fn new(
        mapper: CommandMapper,
        predictor: GesturePredictor,
        executor: Box<dyn ActionExecutor>,
    ) -> Self {
        let log = PredictionLog::new(predictor.config.max_log_entries);
        Self {
            mapper,
            predictor,
            executor,
            log,
            frames: 0,
            inference_errors: 0,
        }
    }

    pub fn from_config(
        config: &InterpreterConfig,
        models: ModelStore,
        executor: Box<dyn ActionExecutor>,
    ) -> Self {
        Self::new(
            CommandMapper::new(config.mapper.clone()),
            GesturePredictor::new(config.predictor.clone(), config.classifier.clone(), models),
            executor,
        )
    }

    /// Process one frame to completion.
    pub fn process_frame(&mut self, frame: FrameSample) -> FrameOutcome {
        self.frames += 1;

        let actions = self.mapper.process(&frame);
        for action in &actions {
            self.executor.execute(action);
        }

        let no_hand = frame.is_empty();
        if no_hand {
            self.log.no_hand();
        }

        let prediction = match self.predictor.observe(frame) {
            None => None,
            Some(Ok(prediction)) => {
                if !no_hand && self.log.record(prediction.label()) {
                    debug!(frame = self.frames, label = prediction.label(), "new prediction");
                }
                Some(prediction)
            }
            Some(Err(e)) => {
                self.inference_errors += 1;
                warn!("Gesture inference failed at frame {}: {:#}", self.frames, e);
                None
            }
        };

        FrameOutcome { actions, prediction }
    }

    pub fn mapper(&self) -> &CommandMapper {
        &self.mapper
    }

    pub fn predictor(&self) -> &GesturePredictor {
        &self.predictor
    }

    pub fn log(&self) -> &PredictionLog {
        &self.log
    }

    /// Frames processed since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn inference_errors(&self) -> u64 {
        self.inference_errors
    }

    /// Clear all per-session state. Models and the executor are kept.
    pub fn reset(&mut self) {
        self.mapper.reset();
        self.predictor.reset();
        self.log.clear();
        self.frames = 0;
        self.inference_errors = 0;
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:frames {} :inference-errors {} :mapper {} :predictor {} :predictions {})",
            self.frames,
            self.inference_errors,
            self.mapper.status_sexp(),
            self.predictor.status_sexp(),
            self.log.log_sexp(),
        )
    }
}
