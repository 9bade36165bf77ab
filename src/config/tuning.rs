//! Tunable engine parameters, loaded from TOML.
//!
//! Every table is optional; a partial file overrides only the values it names
//! and the rest fall back to the constants defined by each component.
//!
//! ```toml
//! [fairness]
//! preference = 0.30
//! skill = 0.20
//!
//! [delegation]
//! expiry_hours = 24
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::burnout::{BurnoutPrevention, BurnoutSettings};
use crate::delegation::{DelegationEngine, DelegationSettings};
use crate::error::{Error, Result};
use crate::fairness::{FairnessAlgorithm, FairnessWeights};
use crate::predictor::{PredictionSettings, WorkloadPredictor};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub fairness: FairnessWeights,
    pub burnout: BurnoutSettings,
    pub prediction: PredictionSettings,
    pub delegation: DelegationSettings,
}

impl Tuning {
    /// Read and validate a tuning file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read tuning file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad tuning file {}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tuning: Tuning = toml::from_str(content)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would break scoring invariants.
    pub fn validate(&self) -> Result<()> {
        let w = &self.fairness;
        let weights = [
            ("load_balance", w.load_balance),
            ("recent_activity", w.recent_activity),
            ("preference", w.preference),
            ("skill", w.skill),
            ("availability", w.availability),
        ];
        if let Some((name, value)) = weights.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(Error::Config(format!(
                "fairness weight {name} must be non-negative, got {value}"
            )));
        }
        let sum = w.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "fairness weights must sum to 1.0, got {sum}"
            )));
        }

        let b = &self.burnout;
        if b.consecutive_overload_days == 0 || b.rest_window_days == 0 {
            return Err(Error::Config(
                "burnout day windows must be at least one day".to_string(),
            ));
        }
        if !(1..=10).contains(&b.high_priority) {
            return Err(Error::Config(format!(
                "burnout.high_priority must be within 1..=10, got {}",
                b.high_priority
            )));
        }
        if !b.high_variance_cv.is_finite() || b.high_variance_cv <= 0.0 {
            return Err(Error::Config(format!(
                "burnout.high_variance_cv must be positive, got {}",
                b.high_variance_cv
            )));
        }

        let p = &self.prediction;
        if p.min_pattern_points < 2 || p.trend_window < 2 || p.anomaly_window < 2 {
            return Err(Error::Config(
                "prediction windows must cover at least two points".to_string(),
            ));
        }
        if !p.anomaly_threshold.is_finite() || p.anomaly_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "prediction.anomaly_threshold must be positive, got {}",
                p.anomaly_threshold
            )));
        }

        let d = &self.delegation;
        if d.expiry_hours == 0 {
            return Err(Error::Config(
                "delegation.expiry_hours must be positive".to_string(),
            ));
        }
        if d.decline_penalty < 0.0 || d.max_decline_penalty < 0.0 {
            return Err(Error::Config(
                "delegation penalties must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fairness(&self) -> FairnessAlgorithm {
        FairnessAlgorithm::new(self.fairness)
    }

    pub fn predictor(&self) -> WorkloadPredictor {
        WorkloadPredictor::new(self.prediction)
    }

    pub fn burnout(&self) -> BurnoutPrevention {
        BurnoutPrevention::new(self.burnout)
    }

    pub fn delegation(&self) -> DelegationEngine {
        DelegationEngine::new(self.delegation)
    }
}
