//! Schema definitions for canopy input and output formats.
//!
//! This crate contains the data structures exchanged between the biomass
//! and calibration phases and the external service layer. Every type is
//! serialized to JSON, and JSON Schema is derived from the Rust types so
//! consumers can validate payloads without reading this crate.
//!
//! - [`FittedModel`]: a trained AGB regression model and its fit quality
//! - [`Sample`] / [`TrainingSet`]: assembled regression inputs
//! - [`TrainingRow`]: raw, possibly incomplete rows from the sample store
//! - [`TreeSurvey`] / [`TreeBiomass`]: per-tree biomass requests and results
//! - [`FeatureRow`] / [`Prediction`]: model application inputs and outputs
//! - [`RasterPlan`]: the model restated per band for an external engine
//!
//! Why: keeping schemas in one crate guarantees consistent serialization
//! contracts across the trainer, the biomass service, and the CLI.

mod features;
mod fitted_model;
mod raster;
#[cfg(test)]
mod testutil;
mod training;
mod trees;

#[doc(inline)]
pub use features::*;
#[doc(inline)]
pub use fitted_model::*;
#[doc(inline)]
pub use raster::*;
#[doc(inline)]
pub use training::*;
#[doc(inline)]
pub use trees::*;
