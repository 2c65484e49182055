//! Regression training inputs.
//!
//! Two shapes exist. [`TrainingRow`] mirrors what the sample store hands
//! over: one surveyed plot with whatever feature values were extracted
//! for it, any of which may be missing. [`Sample`] and [`TrainingSet`]
//! are the assembled, complete form the trainer consumes.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One complete regression observation: feature values in the order of
/// the owning [`TrainingSet::feature_names`], plus the measured AGB label.
///
/// The label is expected to be positive but that is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sample {
    /// Feature values, one per declared feature name.
    pub features: Vec<f64>,

    /// Measured above-ground biomass.
    pub label: f64,
}

impl Sample {
    /// Creates a sample from its feature vector and label.
    pub fn new(features: Vec<f64>, label: f64) -> Self {
        Self { features, label }
    }
}

/// An assembled training set: the declared feature names and the samples
/// whose feature vectors follow that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainingSet {
    /// Feature names, in the column order of every sample.
    pub feature_names: Vec<String>,

    /// Training samples.
    pub samples: Vec<Sample>,
}

impl TrainingSet {
    /// Number of declared features.
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the set holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Labels in sample order.
    pub fn labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

/// A raw training row as exported by the sample store.
///
/// Feature values are optional because spectral extraction can fail for
/// individual plots (cloud cover, edge pixels). The AGB label is optional
/// because plots without an approved survey have none.
///
/// ```json
/// {"id": "p-17", "features": {"ndvi": 0.71, "evi": null}, "agb_kg_per_m2": 12.5}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainingRow {
    /// Identifier of the sampling point, used in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Extracted feature values keyed by feature name.
    #[serde(default)]
    pub features: BTreeMap<String, Option<f64>>,

    /// Measured AGB in kg per square metre.
    #[serde(default, rename = "agb_kg_per_m2", alias = "agb")]
    pub agb: Option<f64>,
}

impl TrainingRow {
    /// Returns the value for `feature`, treating an explicit `null` and an
    /// absent key alike.
    pub fn feature(&self, feature: &str) -> Option<f64> {
        self.features.get(feature).copied().flatten()
    }
}
