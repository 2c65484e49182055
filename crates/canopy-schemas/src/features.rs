//! Model application inputs and outputs.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Feature values for one location, keyed by feature name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureRow {
    /// Identifier of the location, echoed back in the prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Feature values.
    pub features: BTreeMap<String, f64>,
}

/// Predicted AGB for one [`FeatureRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Prediction {
    /// Identifier copied from the feature row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Predicted AGB in kg per square metre.
    pub agb_kg_per_m2: f64,
}
