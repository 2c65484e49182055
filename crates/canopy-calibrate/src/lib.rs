//! Calibration services around the formula evaluator and the regression
//! solver.
//!
//! This crate is the layer a service talks to. It owns the policies the
//! core crates deliberately leave out:
//!
//! - per-tree biomass with species fallbacks ([`survey_biomass`])
//! - training-set assembly with a minimum sample count
//!   ([`assemble_training_set`])
//! - spectral index derivation from raw reflectance bands ([`spectral`])
//! - the per-band plan an external raster engine applies ([`raster_plan`])
//!
//! Each `run_*` function reads one JSON document from a reader and writes
//! one JSON document to a writer, so the CLI and tests drive the same
//! code.
//!
//! ## Usage
//!
//! ```no_run
//! use canopy_calibrate::{CalibrationConfig, run_train};
//!
//! let input = std::fs::File::open("samples.json").unwrap();
//! let mut model_json = Vec::new();
//! let config = CalibrationConfig::default();
//! let report = run_train(input, &mut model_json, &config).unwrap();
//! report.write_report(std::io::stderr()).unwrap();
//! ```

mod biomass;
mod config;
mod error;
mod raster;
mod report;
pub mod spectral;
mod training;

use std::io::{Read, Write};

use canopy_schemas::{
    FeatureRow, FittedModel, Prediction, TrainingRow, TreeSurvey,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug_span, info};

#[doc(inline)]
pub use crate::biomass::{
    BiomassEquation, SpeciesBiomass, survey_biomass, tree_variables,
};
#[doc(inline)]
pub use crate::config::{
    CalibrationConfig, DEFAULT_FEATURES, DEFAULT_MIN_SAMPLES,
};
#[doc(inline)]
pub use crate::error::CalibrateError;
#[doc(inline)]
pub use crate::raster::raster_plan;
#[doc(inline)]
pub use crate::report::TrainingReport;
#[doc(inline)]
pub use crate::training::{AssembledTrainingSet, assemble_training_set};

fn read_json<T: DeserializeOwned>(
    mut input: impl Read,
) -> Result<T, CalibrateError> {
    let mut json = String::new();
    input.read_to_string(&mut json)?;
    serde_json::from_str(&json).map_err(CalibrateError::deserialization)
}

fn write_json<T: Serialize>(
    mut output: impl Write,
    value: &T,
) -> Result<(), CalibrateError> {
    serde_json::to_writer_pretty(&mut output, value)
        .map_err(CalibrateError::serialization)?;
    writeln!(output)?;
    Ok(())
}

/// Trains a model from a JSON array of [`TrainingRow`]s.
///
/// Missing `ndvi` / `evi` values are derived from raw `b2`, `b4`, `b8`
/// bands when a row carries them. The fitted model is written to `output`
/// as JSON; the returned report summarizes the run.
///
/// # Errors
///
/// Returns [`CalibrateError`] if:
/// - the input cannot be read or parsed ([`CalibrateError::is_io`],
///   [`CalibrateError::is_deserialization`])
/// - there are fewer labeled rows than `config.min_samples`
///   ([`CalibrateError::is_insufficient_samples`])
/// - a labeled row lacks a configured feature
///   ([`CalibrateError::is_missing_feature`])
/// - the fit fails, e.g. on a singular matrix
///   ([`CalibrateError::is_regress`])
pub fn run_train(
    input: impl Read,
    output: impl Write,
    config: &CalibrationConfig,
) -> Result<TrainingReport, CalibrateError> {
    let _span = debug_span!("run_train").entered();
    config.validate()?;

    let mut rows: Vec<TrainingRow> = read_json(input)?;
    rows.iter_mut().for_each(spectral::derive_row_indices);

    let assembled =
        assemble_training_set(&rows, &config.features, config.min_samples)?;
    let model = canopy_regress::fit_training_set(&assembled.training_set)?;

    write_json(output, &model)?;
    Ok(TrainingReport {
        model,
        unlabeled: assembled.unlabeled,
    })
}

/// Computes per-tree biomass for a JSON [`TreeSurvey`] and writes a JSON
/// array of [`canopy_schemas::TreeBiomass`].
///
/// # Errors
///
/// Besides I/O and JSON failures, returns a formula error
/// ([`CalibrateError::is_formula`]) naming the first tree whose biomass
/// could not be computed.
pub fn run_biomass(
    input: impl Read,
    output: impl Write,
) -> Result<(), CalibrateError> {
    let _span = debug_span!("run_biomass").entered();

    let survey: TreeSurvey = read_json(input)?;
    let results = survey_biomass(&survey)?;
    info!(trees = results.len(), "computed tree biomass");

    write_json(output, &results)
}

/// Applies `model` to a JSON array of [`FeatureRow`]s and writes a JSON
/// array of [`Prediction`]s in the same order.
///
/// Missing indices are derived from raw bands as in [`run_train`].
///
/// # Errors
///
/// Besides I/O and JSON failures, returns
/// [`CalibrateError::is_invalid_model`] when the model's coefficients
/// disagree with its feature names, and a regression error
/// ([`CalibrateError::is_regress`]) for the first row lacking a model
/// feature.
pub fn run_predict(
    input: impl Read,
    output: impl Write,
    model: &FittedModel,
) -> Result<(), CalibrateError> {
    let _span = debug_span!("run_predict").entered();
    if !model.is_consistent() {
        return Err(CalibrateError::invalid_model());
    }

    let mut rows: Vec<FeatureRow> = read_json(input)?;
    let predictions = rows
        .iter_mut()
        .map(|row| -> Result<Prediction, CalibrateError> {
            spectral::derive_indices(&mut row.features);
            Ok(Prediction {
                id: row.id.clone(),
                agb_kg_per_m2: canopy_regress::predict(model, &row.features)?,
            })
        })
        .collect::<Result<Vec<_>, CalibrateError>>()?;

    write_json(output, &predictions)
}

/// Reads a JSON [`FittedModel`] and writes its [`raster_plan`].
///
/// # Errors
///
/// Besides I/O and JSON failures, returns
/// [`CalibrateError::is_invalid_model`] for an inconsistent model and
/// [`CalibrateError::is_unknown_band`] when a model feature has no
/// composite band.
pub fn run_raster_plan(
    input: impl Read,
    output: impl Write,
) -> Result<(), CalibrateError> {
    let _span = debug_span!("run_raster_plan").entered();

    let model: FittedModel = read_json(input)?;
    let plan = raster_plan(&model)?;
    write_json(output, &plan)
}
