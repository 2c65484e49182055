//! Per-band application plan for an external raster engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the band holding predicted AGB in the exported image.
pub const AGB_OUTPUT_BAND: &str = "AGB_kg_m2";

/// Ground resolution of the exported AGB image, in metres per pixel.
pub const DEFAULT_EXPORT_SCALE_M: f64 = 10.0;

/// Upper bound on exported pixels passed to the raster engine.
pub const DEFAULT_MAX_PIXELS: f64 = 1e13;

/// One `coefficient × band` term of the linear combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RasterTerm {
    /// Model feature name, e.g. `ndvi`.
    pub feature: String,

    /// Composite band the feature is read from, e.g. `NDVI`.
    pub band: String,

    /// Coefficient multiplied with the band.
    pub coefficient: f64,
}

/// Everything an external engine needs to compute
/// `output_band = intercept + Σ coefficient × band` per pixel.
///
/// Why: the engine never sees the trainer, so the plan restates the model
/// in the engine's band vocabulary and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RasterPlan {
    /// Constant image the terms are added to.
    pub intercept: f64,

    /// Terms in model coefficient order.
    pub terms: Vec<RasterTerm>,

    /// Name of the resulting band.
    pub output_band: String,

    /// Source reflectance bands the composite must provide to derive every
    /// term, sorted and deduplicated.
    pub source_bands: Vec<String>,

    /// Export resolution in metres per pixel.
    pub scale_m: f64,

    /// Export pixel budget.
    pub max_pixels: f64,
}
