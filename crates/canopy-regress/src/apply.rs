//! Applying a fitted model to feature values.
//!
//! All entry points compute `intercept + Σ coefficient_i × x_i` in
//! `feature_names` order with the same sequence of additions, so a sample
//! predicted by name, by position, or as part of a column batch yields the
//! same bits.

use std::collections::BTreeMap;

use canopy_schemas::FittedModel;

use crate::error::RegressError;

/// Coefficients in `feature_names` order, or the first declared feature
/// the model has no coefficient for.
fn ordered_coefficients(model: &FittedModel) -> Result<Vec<f64>, RegressError> {
    model
        .feature_names
        .iter()
        .map(|name| {
            model
                .coefficient(name)
                .ok_or_else(|| RegressError::unknown_feature(name.as_str()))
        })
        .collect()
}

fn combine(intercept: f64, coefficients: &[f64], values: &[f64]) -> f64 {
    coefficients
        .iter()
        .zip(values)
        .fold(intercept, |acc, (c, x)| acc + c * x)
}

/// Predicts AGB for one sample given as a name-keyed feature map.
///
/// Every model feature is looked up before any arithmetic; the first one
/// missing fails with an unknown-feature error. Extra entries are ignored.
pub fn predict(
    model: &FittedModel,
    features: &BTreeMap<String, f64>,
) -> Result<f64, RegressError> {
    let coefficients = ordered_coefficients(model)?;
    let values = model
        .feature_names
        .iter()
        .map(|name| {
            features
                .get(name)
                .copied()
                .ok_or_else(|| RegressError::unknown_feature(name.as_str()))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    Ok(combine(model.intercept, &coefficients, &values))
}

/// Predicts AGB for one sample given positionally in `feature_names` order.
pub fn predict_row(
    model: &FittedModel,
    values: &[f64],
) -> Result<f64, RegressError> {
    let coefficients = ordered_coefficients(model)?;
    if values.len() != coefficients.len() {
        return Err(RegressError::dimension_mismatch(
            "row",
            0,
            coefficients.len(),
            values.len(),
        ));
    }
    Ok(combine(model.intercept, &coefficients, values))
}

/// Predicts AGB for a batch stored column-major, one column per feature
/// name, as a raster engine holds bands.
///
/// All model features must be present and every used column must have the
/// same length. Returns one prediction per row.
pub fn predict_columns(
    model: &FittedModel,
    columns: &BTreeMap<String, Vec<f64>>,
) -> Result<Vec<f64>, RegressError> {
    let coefficients = ordered_coefficients(model)?;
    let used = model
        .feature_names
        .iter()
        .map(|name| {
            columns
                .get(name)
                .map(Vec::as_slice)
                .ok_or_else(|| RegressError::unknown_feature(name.as_str()))
        })
        .collect::<Result<Vec<&[f64]>, _>>()?;

    let rows = used.first().map_or(0, |column| column.len());
    if let Some((index, column)) =
        used.iter().enumerate().find(|(_, c)| c.len() != rows)
    {
        return Err(RegressError::dimension_mismatch(
            "column",
            index,
            rows,
            column.len(),
        ));
    }

    let mut values = vec![0.0; used.len()];
    let predictions = (0..rows)
        .map(|row| {
            for (value, column) in values.iter_mut().zip(&used) {
                *value = column[row];
            }
            combine(model.intercept, &coefficients, &values)
        })
        .collect();
    Ok(predictions)
}
