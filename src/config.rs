//! Interpreter configuration.
//!
//! Every threshold has a default. A config file is an s-expression plist
//! that overrides any subset of them:
//!
//! ```text
//! (:debounce-frames 8 :click-threshold 0.04 :window-size 30 :target-fps 25)
//! ```
//!
//! Unknown keys are ignored. A known key with a bad value is an error.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use lexpr::Value;

use crate::classify::{ClassifierConfig, PredictorConfig};
use crate::command::MapperConfig;
use crate::session::SessionConfig;
use crate::sexp::{get_value, number};

#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    pub mapper: MapperConfig,
    pub classifier: ClassifierConfig,
    pub predictor: PredictorConfig,
    pub session: SessionConfig,
}

impl InterpreterConfig {
    /// Defaults overridden by the keys present in `src`.
    pub fn from_sexp(src: &str) -> anyhow::Result<Self> {
        let value = lexpr::from_str(src).map_err(|e| anyhow!("malformed config: {e}"))?;
        let mut config = Self::default();
        config.apply(&value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_sexp(&src).with_context(|| format!("invalid config {}", path.display()))
    }

    fn apply(&mut self, v: &Value) -> anyhow::Result<()> {
        let m = &mut self.mapper;
        set_u32(v, "debounce-frames", 1, &mut m.debounce_frames)?;
        set_u32(v, "switch-cooldown-frames", 0, &mut m.switch_cooldown_frames)?;
        set_f32(v, "freeze-threshold", 0.0, 1.0, &mut m.freeze_threshold)?;
        set_f32(v, "click-threshold", 0.0, 1.0, &mut m.click_threshold)?;
        set_f32(v, "frame-margin", 0.0, 0.49, &mut m.frame_margin)?;
        set_f32(v, "thumb-high-margin", 0.0, 1.0, &mut m.thumb_high_margin)?;
        set_f32(v, "scroll-up-below", 0.0, 1.0, &mut m.scroll_up_below)?;
        set_f32(v, "scroll-down-above", 0.0, 1.0, &mut m.scroll_down_above)?;
        set_f32(v, "volume-dead-zone", 0.0, 1.0, &mut m.volume_dead_zone)?;

        let c = &mut self.classifier;
        set_usize(v, "window-size", 2, &mut c.window_size)?;
        set_f32(v, "min-hand-scale", 0.0, 1.0, &mut c.min_hand_scale)?;
        set_f32(v, "dynamic-translation", 0.0, f32::MAX, &mut c.dynamic_translation)?;
        set_f32(v, "wiggle-threshold", 0.0, f32::MAX, &mut c.wiggle_threshold)?;

        let p = &mut self.predictor;
        set_u32(v, "predict-every-frames", 1, &mut p.predict_every_frames)?;
        set_usize(v, "max-log-entries", 1, &mut p.max_log_entries)?;

        set_u32(v, "target-fps", 1, &mut self.session.target_fps)?;
        Ok(())
    }

    /// Cross-field checks.
    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.mapper;
        if m.scroll_up_below > m.scroll_down_above {
            bail!(
                "scroll-up-below ({}) must not exceed scroll-down-above ({})",
                m.scroll_up_below,
                m.scroll_down_above
            );
        }
        if self.classifier.window_size < 2 {
            bail!("window-size must be at least 2, got {}", self.classifier.window_size);
        }
        if self.session.target_fps == 0 || self.session.target_fps > 240 {
            bail!("target-fps must be within [1, 240], got {}", self.session.target_fps);
        }
        Ok(())
    }

    /// Generate s-expression of the effective configuration. Parses back
    /// with `from_sexp`.
    pub fn config_sexp(&self) -> String {
        format!(
            "({} :window-size {} :min-hand-scale {:.4} :dynamic-translation {:.3} :wiggle-threshold {:.5} :predict-every-frames {} :max-log-entries {} :target-fps {})",
            self.mapper.plist_fields(),
            self.classifier.window_size,
            self.classifier.min_hand_scale,
            self.classifier.dynamic_translation,
            self.classifier.wiggle_threshold,
            self.predictor.predict_every_frames,
            self.predictor.max_log_entries,
            self.session.target_fps,
        )
    }
}

fn set_f32(v: &Value, key: &str, min: f32, max: f32, field: &mut f32) -> anyhow::Result<()> {
    let Some(raw) = get_value(v, key) else {
        return Ok(());
    };
    let n = number(raw).ok_or_else(|| anyhow!(":{key} must be a number"))? as f32;
    if !(min..=max).contains(&n) {
        bail!(":{key} must be within [{min}, {max}], got {n}");
    }
    *field = n;
    Ok(())
}

fn get_count(v: &Value, key: &str, min: u64) -> anyhow::Result<Option<u64>> {
    let Some(raw) = get_value(v, key) else {
        return Ok(None);
    };
    let n = match raw {
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
    .ok_or_else(|| anyhow!(":{key} must be a non-negative integer"))?;
    if n < min {
        bail!(":{key} must be at least {min}, got {n}");
    }
    Ok(Some(n))
}

fn set_u32(v: &Value, key: &str, min: u32, field: &mut u32) -> anyhow::Result<()> {
    if let Some(n) = get_count(v, key, u64::from(min))? {
        *field = u32::try_from(n).map_err(|_| anyhow!(":{key} is too large"))?;
    }
    Ok(())
}

fn set_usize(v: &Value, key: &str, min: usize, field: &mut usize) -> anyhow::Result<()> {
    if let Some(n) = get_count(v, key, min as u64)? {
        *field = usize::try_from(n).map_err(|_| anyhow!(":{key} is too large"))?;
    }
    Ok(())
}
