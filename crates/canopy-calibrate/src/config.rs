//! Calibration settings.

use std::collections::HashSet;
use std::path::Path;

use canopy_formula::{CHAVE_DEFAULT_FORMULA, Normalizer};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrateError, CalibrateErrorKind};

/// Spectral features used for training when none are configured.
pub const DEFAULT_FEATURES: [&str; 4] = ["ndvi", "evi", "b4", "b8"];

/// Minimum number of labeled rows required to train when none is
/// configured.
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Settings for biomass computation and model training.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// {"features": ["ndvi", "b8"], "min_samples": 20}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Feature names in model order.
    pub features: Vec<String>,

    /// Fewest labeled rows a training run accepts.
    ///
    /// Why: a regression on a handful of plots fits noise; the solver
    /// itself only needs `features + 1` distinct points.
    pub min_samples: usize,

    /// Formula stored for species registered without one.
    pub default_formula: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            features: DEFAULT_FEATURES
                .iter()
                .map(ToString::to_string)
                .collect(),
            min_samples: DEFAULT_MIN_SAMPLES,
            default_formula: CHAVE_DEFAULT_FORMULA.to_string(),
        }
    }
}

impl CalibrationConfig {
    /// Loads and validates a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CalibrateError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .map_err(CalibrateError::deserialization)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations no training run could succeed with.
    pub fn validate(&self) -> Result<(), CalibrateError> {
        let invalid = |msg: String| {
            CalibrateError::new(CalibrateErrorKind::InvalidConfig(msg))
        };

        if self.features.is_empty() {
            return Err(invalid("at least one feature is required".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) =
            self.features.iter().find(|f| !seen.insert(f.as_str()))
        {
            return Err(invalid(format!("feature `{dup}` is listed twice")));
        }
        if self.min_samples == 0 {
            return Err(invalid("min_samples must be at least 1".into()));
        }
        if self.default_formula.trim().is_empty() {
            return Err(invalid("default_formula must not be blank".into()));
        }
        Ok(())
    }

    /// Normalizer that substitutes this config's default formula.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.default_formula.clone())
    }
}
