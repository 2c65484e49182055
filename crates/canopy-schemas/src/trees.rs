//! Per-tree biomass request and result schemas.
//!
//! A surveyor measures individual trees on a sampling plot. Each tree
//! belongs to a species whose allometric formula and wood density decide
//! how the measurements turn into biomass.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Field measurements for one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TreeMeasurement {
    /// Identifier of the measurement, echoed back in the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Diameter at breast height in centimetres.
    pub dbh_cm: f64,

    /// Total tree height in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_m: Option<f64>,

    /// Stem circumference at breast height in centimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circumference_cm: Option<f64>,
}

/// Allometric parameters of a tree species.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
pub struct SpeciesAllometry {
    /// Display name of the species.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Basic wood density in g/cm³.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wood_density: Option<f64>,

    /// User-entered biomass formula. Blank or absent means the species
    /// has no formula of its own and the simple fallback applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biomass_formula: Option<String>,
}

impl SpeciesAllometry {
    /// Returns the species formula when it contains anything besides
    /// whitespace.
    pub fn formula(&self) -> Option<&str> {
        self.biomass_formula
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// A batch of tree measurements sharing one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TreeSurvey {
    /// Species of every tree in the batch.
    #[serde(default)]
    pub species: SpeciesAllometry,

    /// Trees to evaluate.
    pub trees: Vec<TreeMeasurement>,
}

/// Computed biomass for one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TreeBiomass {
    /// Identifier copied from the measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Biomass in the unit implied by the species formula.
    pub biomass: f64,
}
