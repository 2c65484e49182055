//! Restating a fitted model for an external raster engine.

use std::collections::BTreeSet;

use canopy_schemas::{
    AGB_OUTPUT_BAND, DEFAULT_EXPORT_SCALE_M, DEFAULT_MAX_PIXELS, FittedModel,
    RasterPlan, RasterTerm,
};

use crate::error::{CalibrateError, CalibrateErrorKind};
use crate::spectral::{band_for_feature, source_bands};

/// Maps every model feature, in `feature_names` order, to its composite
/// band.
///
/// The engine computes `intercept + Σ coefficient × band` per pixel, which
/// is the same contract as [`canopy_regress::predict`] with bands in place
/// of named features. A model whose coefficients disagree with its feature
/// names is rejected, and a feature without a band fails the whole plan.
pub fn raster_plan(model: &FittedModel) -> Result<RasterPlan, CalibrateError> {
    if !model.is_consistent() {
        return Err(CalibrateError::invalid_model());
    }

    let mut sources = BTreeSet::new();
    let terms = model
        .feature_names
        .iter()
        .map(|feature| -> Result<RasterTerm, CalibrateError> {
            let coefficient = model
                .coefficient(feature)
                .ok_or_else(CalibrateError::invalid_model)?;
            let band = band_for_feature(feature).ok_or_else(|| {
                CalibrateError::new(CalibrateErrorKind::UnknownBand {
                    feature: feature.clone(),
                })
            })?;
            sources.extend(source_bands(band).iter().copied());
            Ok(RasterTerm {
                feature: feature.clone(),
                band: band.to_string(),
                coefficient,
            })
        })
        .collect::<Result<Vec<_>, CalibrateError>>()?;

    Ok(RasterPlan {
        intercept: model.intercept,
        terms,
        output_band: AGB_OUTPUT_BAND.to_string(),
        source_bands: sources.into_iter().map(ToString::to_string).collect(),
        scale_m: DEFAULT_EXPORT_SCALE_M,
        max_pixels: DEFAULT_MAX_PIXELS,
    })
}
