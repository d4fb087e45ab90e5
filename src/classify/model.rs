//! Trained gesture models and their on-disk format.
//!
//! Models are produced offline. At runtime they are read once from
//! s-expression files:
//!
//! ```text
//! (:kind nearest-centroid
//!  :input-len 84
//!  :classes ((:label "fist" :centroid (0.0 0.0 ...))
//!            (:label "open" :centroid (0.0 0.0 ...))))
//! ```

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use tracing::{info, warn};

use crate::sexp::{get_int, get_keyword, get_value, list_items, number_list};

/// A trained classifier mapping a feature vector to a gesture label.
pub trait GestureModel: Send {
    /// Predict a label. An `Err` is an inference failure, never a label.
    fn predict(&self, features: &[f32]) -> anyhow::Result<String>;

    /// Expected feature length, if the model declares one.
    fn input_len(&self) -> Option<usize> {
        None
    }
}

/// Which of the two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Single-frame pose classifier (84 inputs).
    Static,
    /// Whole-window sequence classifier (W × 84 inputs).
    Dynamic,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

// ── Nearest centroid ───────────────────────────────────────

/// Nearest-centroid classifier: the label whose centroid has the smallest
/// squared Euclidean distance to the input wins.
#[derive(Debug, Clone)]
pub struct NearestCentroidModel {
    input_len: usize,
    classes: Vec<(String, Vec<f32>)>,
}

impl NearestCentroidModel {
    pub fn new(input_len: usize, classes: Vec<(String, Vec<f32>)>) -> anyhow::Result<Self> {
        if classes.is_empty() {
            bail!("model has no classes");
        }
        for (label, centroid) in &classes {
            if centroid.len() != input_len {
                bail!(
                    "centroid for {:?} has {} values, expected {}",
                    label,
                    centroid.len(),
                    input_len
                );
            }
        }
        Ok(Self { input_len, classes })
    }

    /// Parse the s-expression model format.
    pub fn from_sexp(src: &str) -> anyhow::Result<Self> {
        let value = lexpr::from_str(src).map_err(|e| anyhow!("malformed model file: {e}"))?;

        match get_keyword(&value, "kind").as_deref() {
            Some("nearest-centroid") => {}
            Some(other) => bail!("unsupported model kind: {other}"),
            None => bail!("model file missing :kind"),
        }
        let input_len = get_int(&value, "input-len")
            .filter(|n| *n > 0)
            .ok_or_else(|| anyhow!("model file missing positive :input-len"))?
            as usize;

        let classes_value =
            get_value(&value, "classes").ok_or_else(|| anyhow!("model file missing :classes"))?;
        let mut classes = Vec::new();
        for (i, class) in list_items(classes_value).into_iter().enumerate() {
            let label = get_keyword(class, "label")
                .ok_or_else(|| anyhow!("class {i} missing :label"))?;
            let centroid = get_value(class, "centroid")
                .and_then(number_list)
                .ok_or_else(|| anyhow!("class {label:?} has no numeric :centroid"))?;
            classes.push((label, centroid.into_iter().map(|v| v as f32).collect()));
        }
        Self::new(input_len, classes)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model {}", path.display()))?;
        Self::from_sexp(&src).with_context(|| format!("failed to parse model {}", path.display()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|(label, _)| label.as_str())
    }
}

impl GestureModel for NearestCentroidModel {
    fn predict(&self, features: &[f32]) -> anyhow::Result<String> {
        if features.len() != self.input_len {
            bail!(
                "feature vector has {} values, model expects {}",
                features.len(),
                self.input_len
            );
        }
        let squared_distance = |centroid: &[f32]| -> f32 {
            centroid
                .iter()
                .zip(features)
                .map(|(c, f)| (c - f) * (c - f))
                .sum()
        };
        self.classes
            .iter()
            .map(|(label, centroid)| (label, squared_distance(centroid)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(label, _)| label.clone())
            .ok_or_else(|| anyhow!("model has no classes"))
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.input_len)
    }
}

// ── Store ──────────────────────────────────────────────────

/// The static and dynamic models, each independently present or absent.
#[derive(Default)]
pub struct ModelStore {
    static_model: Option<Box<dyn GestureModel>>,
    dynamic_model: Option<Box<dyn GestureModel>>,
}

impl ModelStore {
    pub fn new(
        static_model: Option<Box<dyn GestureModel>>,
        dynamic_model: Option<Box<dyn GestureModel>>,
    ) -> Self {
        Self {
            static_model,
            dynamic_model,
        }
    }

    /// Load both models from disk. A model that fails to load is left
    /// absent and logged; the store then reports not ready.
    pub fn load(static_path: Option<&Path>, dynamic_path: Option<&Path>) -> Self {
        Self {
            static_model: load_slot(ModelKind::Static, static_path),
            dynamic_model: load_slot(ModelKind::Dynamic, dynamic_path),
        }
    }

    pub fn get(&self, kind: ModelKind) -> Option<&dyn GestureModel> {
        match kind {
            ModelKind::Static => self.static_model.as_deref(),
            ModelKind::Dynamic => self.dynamic_model.as_deref(),
        }
    }

    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        self.get(kind).is_some()
    }

    /// Both models are present.
    pub fn is_ready(&self) -> bool {
        self.is_loaded(ModelKind::Static) && self.is_loaded(ModelKind::Dynamic)
    }
}

fn load_slot(kind: ModelKind, path: Option<&Path>) -> Option<Box<dyn GestureModel>> {
    let Some(path) = path else {
        warn!("No {} model configured", kind.as_str());
        return None;
    };
    match NearestCentroidModel::load(path) {
        Ok(model) => {
            info!(
                "Loaded {} model from {} ({} classes)",
                kind.as_str(),
                path.display(),
                model.labels().count()
            );
            Some(Box::new(model))
        }
        Err(e) => {
            warn!("{} model unavailable: {:#}", kind.as_str(), e);
            None
        }
    }
}
